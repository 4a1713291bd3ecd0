// Poll-tick behavior against mocked listing sources: bootstrap, dedup
// across ticks, failure containment and the audience gate.

mod common;

use common::*;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use lodgewatch::config::{BoundingBox, CrousConfig};
use lodgewatch::dispatch::Dispatcher;
use lodgewatch::models::{ListingKey, SourceKind};
use lodgewatch::notify::NotificationContent;
use lodgewatch::poller::SourcePoller;
use lodgewatch::sources::{CrousSource, ListingSource, StudefiSource};
use lodgewatch::storage::Store;

const FETCH_TIMEOUT: Duration = Duration::from_secs(5);

fn listing_page(names_and_links: &[(&str, &str)]) -> String {
    let blocks: String = names_and_links
        .iter()
        .map(|(name, link)| {
            format!(
                r#"<div class="col-sm-6 list-res-elem">
                    <img class="dispoRes" src="/img/places_disponibles.png" />
                    <div class="list-res-link"><a href="{link}">{name}</a></div>
                </div>"#
            )
        })
        .collect();
    format!("<html><body>{blocks}</body></html>")
}

fn dispatcher_without_reservation(
    store: &Store,
    notifier: Arc<RecordingNotifier>,
    base_url: &str,
) -> Arc<Dispatcher> {
    Arc::new(Dispatcher::new(
        store.clone(),
        notifier,
        reservation_config(false),
        studefi_config(base_url),
    ))
}

#[tokio::test]
async fn crous_source_parses_search_response() {
    let server = MockServer::start().await;
    let body = r#"{
        "results": {
            "items": [
                {
                    "id": 1,
                    "label": "Studio A",
                    "available": true,
                    "occupationModes": [{ "type": "alone", "rent": { "min": 40000, "max": 40000 } }]
                },
                { "id": 2, "label": "Studio B", "available": false }
            ]
        }
    }"#;

    Mock::given(method("POST"))
        .and(path("/api/fr/search/41"))
        .and(body_string_contains("\"toolMechanism\":\"residual\""))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .expect(1)
        .mount(&server)
        .await;

    let source = CrousSource::new(
        CrousConfig {
            api_url: format!("{}/api/fr/search/41", server.uri()),
            bounds: BoundingBox {
                lon1: 1.99,
                lat1: 49.09,
                lon2: 2.72,
                lat2: 48.33,
            },
            page_size: 24,
            max_price_minor: 10_000_000,
        },
        FETCH_TIMEOUT,
    )
    .unwrap();

    let items = source.fetch().await.unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].key, ListingKey::Numeric(1));
    assert_eq!(items[0].rent.unwrap().to_string(), "400.00€");
    assert_eq!(items[1].key, ListingKey::Numeric(2));
    assert!(!items[1].available);
}

#[tokio::test]
async fn studefi_source_skips_unavailable_residences() {
    let server = MockServer::start().await;
    let page = r#"<html><body>
        <div class="col-sm-6 list-res-elem">
            <img class="dispoRes" src="/img/places_disponibles.png" />
            <div class="list-res-link"><a href="fiche.php?id=1">Résidence A</a></div>
        </div>
        <div class="col-sm-6 list-res-elem">
            <img class="dispoRes" src="/img/places_non_disponibles.png" />
            <div class="list-res-link"><a href="fiche.php?id=2">Résidence B</a></div>
        </div>
    </body></html>"#;

    Mock::given(method("GET"))
        .and(path("/main.php"))
        .respond_with(ResponseTemplate::new(200).set_body_string(page))
        .mount(&server)
        .await;

    let source = StudefiSource::new(studefi_config(&server.uri()), FETCH_TIMEOUT).unwrap();
    let items = source.fetch().await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].label, "Résidence A");
    assert_eq!(items[0].source, SourceKind::Studefi);
}

#[tokio::test]
async fn poller_reports_only_unseen_items_across_ticks() {
    let server = MockServer::start().await;

    // First tick sees one residence, every later tick sees two.
    Mock::given(method("GET"))
        .and(path("/main.php"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(listing_page(&[("Résidence A", "fiche.php?id=1")])),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/main.php"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_page(&[
            ("Résidence A", "fiche.php?id=1"),
            ("Résidence B", "fiche.php?id=2"),
        ])))
        .mount(&server)
        .await;

    let store = Store::in_memory().await.unwrap();
    store.add_subscriber(1).await.unwrap();
    let notifier = RecordingNotifier::active();
    let dispatcher = dispatcher_without_reservation(&store, notifier.clone(), &server.uri());

    let source = StudefiSource::new(studefi_config(&server.uri()), FETCH_TIMEOUT).unwrap();
    let mut poller = SourcePoller::init(source, store.clone(), dispatcher, Duration::from_secs(3))
        .await
        .unwrap();

    // bootstrap: everything currently listed is new
    poller.tick().await;
    assert_eq!(notifier.recorded().await.len(), 1);

    // second tick: only the newly appeared residence
    poller.tick().await;
    let events = notifier.recorded().await;
    assert_eq!(events.len(), 2);
    match &events[1].1 {
        NotificationContent::NewListing(item) => assert_eq!(item.label, "Résidence B"),
        other => panic!("expected new-listing broadcast, got {:?}", other),
    }

    // third tick: identical collection, zero new items
    poller.tick().await;
    assert_eq!(notifier.recorded().await.len(), 2);
}

#[tokio::test]
async fn failed_fetch_leaves_seen_set_untouched() {
    let server = MockServer::start().await;

    // One failing tick, then a healthy response.
    Mock::given(method("GET"))
        .and(path("/main.php"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/main.php"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(listing_page(&[("Résidence A", "fiche.php?id=1")])),
        )
        .mount(&server)
        .await;

    let store = Store::in_memory().await.unwrap();
    store.add_subscriber(1).await.unwrap();
    let notifier = RecordingNotifier::active();
    let dispatcher = dispatcher_without_reservation(&store, notifier.clone(), &server.uri());

    let source = StudefiSource::new(studefi_config(&server.uri()), FETCH_TIMEOUT).unwrap();
    let mut poller = SourcePoller::init(source, store.clone(), dispatcher, Duration::from_secs(3))
        .await
        .unwrap();

    // failed tick: no broadcast and nothing remembered
    poller.tick().await;
    assert!(notifier.recorded().await.is_empty());
    assert!(store.load_seen(SourceKind::Studefi).await.unwrap().is_empty());

    // the residence still counts as new on the next successful tick
    poller.tick().await;
    assert_eq!(notifier.recorded().await.len(), 1);
}

#[tokio::test]
async fn poller_skips_fetch_without_audience() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/main.php"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_page(&[])))
        .expect(0)
        .mount(&server)
        .await;

    let store = Store::in_memory().await.unwrap();
    store.add_subscriber(1).await.unwrap();
    // Destination not configured: polling would burn quota for nobody.
    let notifier = RecordingNotifier::inactive();
    let dispatcher = dispatcher_without_reservation(&store, notifier.clone(), &server.uri());

    let source = StudefiSource::new(studefi_config(&server.uri()), FETCH_TIMEOUT).unwrap();
    let mut poller = SourcePoller::init(source, store.clone(), dispatcher, Duration::from_secs(3))
        .await
        .unwrap();

    poller.tick().await;
    assert!(notifier.recorded().await.is_empty());
}

#[tokio::test]
async fn restarted_poller_does_not_realert_persisted_keys() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/main.php"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(listing_page(&[("Résidence A", "fiche.php?id=1")])),
        )
        .mount(&server)
        .await;

    let store = Store::in_memory().await.unwrap();
    store.add_subscriber(1).await.unwrap();
    let notifier = RecordingNotifier::active();
    let dispatcher = dispatcher_without_reservation(&store, notifier.clone(), &server.uri());

    let source = StudefiSource::new(studefi_config(&server.uri()), FETCH_TIMEOUT).unwrap();
    let mut poller = SourcePoller::init(
        source,
        store.clone(),
        Arc::clone(&dispatcher),
        Duration::from_secs(3),
    )
    .await
    .unwrap();
    poller.tick().await;
    assert_eq!(notifier.recorded().await.len(), 1);

    // "restart": a fresh poller over the same store seeds from the
    // persisted seen-set
    let source = StudefiSource::new(studefi_config(&server.uri()), FETCH_TIMEOUT).unwrap();
    let mut restarted = SourcePoller::init(source, store.clone(), dispatcher, Duration::from_secs(3))
        .await
        .unwrap();
    restarted.tick().await;
    assert_eq!(notifier.recorded().await.len(), 1);
}
