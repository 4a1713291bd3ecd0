use reqwest::multipart::Part;

use crate::reservation::tokens::StepTokens;
use crate::utils::error::Result;

/// Minimal single-page PDF used as the identity-document attachment on both
/// steps. The remote form requires a file; the content is never inspected
/// before a human follows up on the reservation.
pub const PLACEHOLDER_PDF: &[u8] = b"%PDF-1.4\n1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n2 0 obj\n<< /Type /Pages /Kids [3 0 R] /Count 1 >>\nendobj\n3 0 obj\n<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] >>\nendobj\nxref\n0 4\n0000000000 65535 f\n0000000009 00000 n\n0000000056 00000 n\n0000000111 00000 n\ntrailer\n<< /Size 4 /Root 1 0 R >>\nstartxref\n190\n%%EOF\n";

pub fn identity_document(file_name: &'static str) -> Result<Part> {
    Ok(Part::bytes(PLACEHOLDER_PDF)
        .file_name(file_name)
        .mime_str("application/pdf")?)
}

/// Synthetic applicant profile submitted to the reservation form.
///
/// The form demands a complete civil-status record the watcher never
/// collects, so every field except the contact email is a fixed placeholder;
/// the requester corrects the record via the confirmation email afterwards.
#[derive(Debug, Clone)]
pub struct ApplicantProfile {
    pub email: String,
    pub include_co_tenant: bool,
}

impl ApplicantProfile {
    pub fn placeholder(email: &str, include_co_tenant: bool) -> Self {
        ApplicantProfile {
            email: email.to_string(),
            include_co_tenant,
        }
    }

    /// Step-1 field set: extracted tokens plus the applicant block, with the
    /// optional co-tenant block appended when configured.
    pub fn step1_fields(&self, tokens: &StepTokens) -> Vec<(String, String)> {
        let mut fields = vec![
            ("tokenCSRF", tokens.csrf.as_str()),
            ("srv", tokens.service.as_str()),
            ("op", "saveEtape1"),
            ("cdTemporaire", tokens.temporary_code.as_str()),
            ("cdEsi", tokens.esi_code.as_str()),
            ("idDemandeLogement", tokens.demand_id.as_str()),
            ("idLogement", tokens.listing_id.as_str()),
            ("lbEmail", self.email.as_str()),
            ("lbCivilite", "Monsieur"),
            ("lbNom", "Dupont"),
            ("lbPrenom", "Jean"),
            ("dtNaissance", "01/01/2000"),
            ("lbLieuNaissance", "Paris"),
            ("cdSituationFamille", "Célibataire"),
            ("lbAdresse", "1 rue de la Paix"),
            ("cdPostal", "75001"),
            ("lbVille", "Paris"),
            ("idPays", "484"),
            ("nbTelephone", "0600000000"),
            ("lbSituation", "Etudiant"),
            ("lbPrecisionSituation", ""),
            ("lbTypeEtudes", "Licence"),
            ("lbNomEtablissement", "Université"),
            ("fgBoursier", "0"),
            ("fgJobEtudiant", "0"),
        ]
        .into_iter()
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect::<Vec<_>>();

        if self.include_co_tenant {
            fields.extend(
                [
                    ("lbCiviliteConjoint", "Madame"),
                    ("lbNomConjoint", "Dupont"),
                    ("lbPrenomConjoint", "Marie"),
                    ("dtNaissanceConjoint", "01/01/2000"),
                ]
                .into_iter()
                .map(|(name, value)| (name.to_string(), value.to_string())),
            );
        }

        fields.push(("button".to_string(), "Etape suivante".to_string()));
        fields
    }

    /// Step-2 field set: the second token bag plus the guarantor block.
    pub fn step2_fields(&self, tokens: &StepTokens) -> Vec<(String, String)> {
        vec![
            ("tokenCSRF", tokens.csrf.as_str()),
            ("srv", tokens.service.as_str()),
            ("op", "saveEtape2"),
            ("cdTemporaire", tokens.temporary_code.as_str()),
            ("cdEsi", tokens.esi_code.as_str()),
            (
                "etapePrecedente",
                tokens.previous_step.as_deref().unwrap_or(""),
            ),
            ("idDemandeLogement", tokens.demand_id.as_str()),
            ("idLogement", tokens.listing_id.as_str()),
            ("lbCiviliteGarant", "Monsieur"),
            ("lbNomGarant", "Dupont"),
            ("lbPrenomGarant", "Pierre"),
            ("dtNaissanceGarant", "01/01/1970"),
            ("lbLieuNaissanceGarant", "Paris"),
            ("cdSituationFamilleGarant", "Célibataire"),
            ("cdLienParenteGarant", "Père / Mère"),
            ("lbAdresseGarant", "1 rue de la Paix"),
            ("cdPostalGarant", "75001"),
            ("lbVilleGarant", "Paris"),
            ("idPaysGarant", "484"),
            ("nbTelephoneGarant", "0600000001"),
            ("lbEmailGarant", "dupont.pierre@example.com"),
            ("lbProfessionGarant", "Employé"),
            ("nbPersonnesAChargeGarant", "0"),
            ("lbLocataireProprietaireGarant", "Propriétaire"),
            ("dtDebutProprietaireGarant", "01/01/2010"),
            ("nbMontantLoyerGarant", "1000"),
            ("nbRevenusGarant", "3000"),
            ("nbMoisRevenusGarant", "12"),
            ("lbPrecisionRevenusGarant", "CDI"),
            ("nbChargesGarant", "500"),
            ("button", "Etape suivante"),
        ]
        .into_iter()
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect()
    }
}
