use scraper::{ElementRef, Html, Selector};

/// Fixed element id of the reservation form on every step page.
pub const FORM_ID: &str = "form1";

/// Server-generated hidden values that must be carried from one step's
/// response into the next step's submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepTokens {
    pub csrf: String,
    pub service: String,
    pub temporary_code: String,
    pub esi_code: String,
    pub demand_id: String,
    pub listing_id: String,
    /// Present from step 2 onward.
    pub previous_step: Option<String>,
}

/// The reservation form of one step page: its token bag plus the action
/// the page wants the submission posted to.
#[derive(Debug, Clone)]
pub struct StepForm {
    pub tokens: StepTokens,
    /// Declared form action, possibly relative, possibly absent.
    pub action: Option<String>,
}

/// Locate the step form in a response body and pull out its hidden values.
/// Returns `None` when the form is absent, which means the flow did not
/// advance; the session treats that as a terminal failure, not an error.
pub fn extract_step_form(body: &str) -> Option<StepForm> {
    let form_selector = Selector::parse(&format!("form#{}", FORM_ID)).ok()?;
    let document = Html::parse_document(body);
    let form = document.select(&form_selector).next()?;

    let action = form
        .value()
        .attr("action")
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(str::to_string);

    let tokens = StepTokens {
        csrf: hidden_value(&form, "tokenCSRF"),
        service: hidden_value(&form, "srv"),
        temporary_code: hidden_value(&form, "cdTemporaire"),
        esi_code: hidden_value(&form, "cdEsi"),
        demand_id: hidden_value(&form, "idDemandeLogement"),
        listing_id: hidden_value(&form, "idLogement"),
        previous_step: {
            let value = hidden_value(&form, "etapePrecedente");
            if value.is_empty() { None } else { Some(value) }
        },
    };

    Some(StepForm { tokens, action })
}

/// Missing inputs yield an empty value rather than failing the step; the
/// remote system decides whether it can live without them.
fn hidden_value(form: &ElementRef<'_>, name: &str) -> String {
    let Ok(input_selector) = Selector::parse(&format!(r#"input[name="{}"]"#, name)) else {
        return String::new();
    };
    form.select(&input_selector)
        .next()
        .and_then(|input| input.value().attr("value"))
        .unwrap_or_default()
        .to_string()
}
