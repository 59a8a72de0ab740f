use std::future::Future;
use std::sync::Arc;
use std::task::{Context, Poll, RawWaker, RawWakerVTable, Waker};

use growthline_core::{
    DataSource, Endpoint, Entity, FiscalDate, Metric, ObservationRequest, PeriodKind,
    PeriodRange, ProviderId, Snapshot, SourceErrorKind, Symbol,
};

const SNAPSHOT: &str = r#"{
    "universe": [{"symbol": "AAPL", "name": "Apple Inc.", "filer_id": "320193"}],
    "company_facts": {
        "AAPL": {
            "entity_name": "Apple Inc.",
            "facts": [
                {
                    "concept": "us-gaap:Revenues",
                    "unit": "USD",
                    "form": "10-K",
                    "start": "2022-10-01",
                    "end": "2023-09-30",
                    "value": 383285000000.0,
                    "filed": "2023-11-03"
                }
            ]
        }
    },
    "providers": {
        "yahoo": {
            "annual": {
                "AAPL": {
                    "revenue": [
                        {"period_end": "2023-09-30", "value": 383.3},
                        {"period_end": "2015-09-30", "value": 233.7},
                        {"period_end": "2022-09-30", "value": 394.3, "concept_label": "totalRevenue"}
                    ],
                    "eps_diluted": [
                        {"period_end": "2023-09-30", "value": null}
                    ]
                }
            }
        },
        "fmp": {
            "failure": {"kind": "auth_failed", "message": "invalid api key"}
        },
        "finnhub": {
            "failure": {"kind": "rate_limited"}
        }
    }
}"#;

#[derive(Clone)]
struct ProviderCase {
    id: ProviderId,
    source: Arc<dyn DataSource>,
}

fn provider_cases() -> Vec<ProviderCase> {
    let snapshot = Arc::new(Snapshot::from_json(SNAPSHOT).expect("valid snapshot"));
    Snapshot::sources(&snapshot)
        .into_iter()
        .map(|source| ProviderCase {
            id: source.id(),
            source,
        })
        .collect()
}

fn source(provider: ProviderId) -> Arc<dyn DataSource> {
    provider_cases()
        .into_iter()
        .find(|case| case.id == provider)
        .map(|case| case.source)
        .unwrap_or_else(|| panic!("provider '{provider}' not registered"))
}

fn entity(symbol: &str) -> Entity {
    Entity::new(Symbol::parse(symbol).expect("valid symbol"))
}

fn date(value: &str) -> FiscalDate {
    FiscalDate::parse(value).expect("valid date")
}

fn request(symbol: &str, kind: PeriodKind, metric: Metric) -> ObservationRequest {
    let range = PeriodRange::new(date("2019-01-01"), date("2024-06-30")).expect("valid range");
    ObservationRequest::new(entity(symbol), kind, metric, range)
}

#[test]
fn snapshot_registers_primary_and_listed_providers() {
    let ids = provider_cases()
        .into_iter()
        .map(|case| case.id)
        .collect::<Vec<_>>();

    assert_eq!(ids[0], ProviderId::Sec);
    assert!(ids.contains(&ProviderId::Yahoo));
    assert!(ids.contains(&ProviderId::Fmp));
    assert!(ids.contains(&ProviderId::Finnhub));
    assert!(!ids.contains(&ProviderId::Alphavantage));
}

#[test]
fn capabilities_split_primary_from_secondary_providers() {
    for case in provider_cases() {
        let capabilities = case.source.capabilities();
        if case.id.is_primary() {
            assert!(capabilities.supports(Endpoint::CompanyFacts), "{}", case.id);
            assert!(!capabilities.supports(Endpoint::AnnualSeries), "{}", case.id);
        } else {
            assert!(!capabilities.supports(Endpoint::CompanyFacts), "{}", case.id);
            assert!(capabilities.supports(Endpoint::AnnualSeries), "{}", case.id);
            assert!(capabilities.supports(Endpoint::QuarterlySeries), "{}", case.id);
        }
    }
}

#[test]
fn unsupported_endpoints_fail_with_unsupported_endpoint() {
    for case in provider_cases() {
        let error = if case.id.is_primary() {
            block_on(
                case.source
                    .observations(request("AAPL", PeriodKind::Annual, Metric::Revenue)),
            )
            .expect_err("primary source serves filings only")
        } else {
            block_on(case.source.company_facts(entity("AAPL")))
                .expect_err("secondary sources serve series only")
        };
        assert_eq!(
            error.kind(),
            SourceErrorKind::UnsupportedEndpoint,
            "provider '{}'",
            case.id
        );
        assert_eq!(error.code(), "source.unsupported_endpoint");
    }
}

#[test]
fn company_facts_return_filings_for_known_entity() {
    let facts = block_on(source(ProviderId::Sec).company_facts(entity("AAPL")))
        .expect("filings present");

    assert_eq!(facts.entity_name.as_deref(), Some("Apple Inc."));
    assert_eq!(facts.facts.len(), 1);
    assert_eq!(facts.facts[0].duration_days(), Some(364));
}

#[test]
fn unknown_entity_is_not_found() {
    let error = block_on(source(ProviderId::Sec).company_facts(entity("ZZZZ")))
        .expect_err("no filings");
    assert_eq!(error.kind(), SourceErrorKind::NotFound);

    let error = block_on(
        source(ProviderId::Yahoo).observations(request("ZZZZ", PeriodKind::Annual, Metric::Revenue)),
    )
    .expect_err("no series");
    assert_eq!(error.kind(), SourceErrorKind::NotFound);
}

#[test]
fn observations_are_in_range_sorted_and_labeled() {
    let set = block_on(
        source(ProviderId::Yahoo).observations(request("AAPL", PeriodKind::Annual, Metric::Revenue)),
    )
    .expect("series present");

    let ends = set
        .observations
        .iter()
        .map(|observation| observation.period_end)
        .collect::<Vec<_>>();
    assert_eq!(ends, vec![date("2022-09-30"), date("2023-09-30")]);

    let first = &set.observations[0];
    assert_eq!(first.provider, ProviderId::Yahoo);
    assert_eq!(first.period_kind, PeriodKind::Annual);
    assert_eq!(first.concept_label, "totalRevenue");
    assert_eq!(set.observations[1].concept_label, "yahoo:revenue");
}

#[test]
fn missing_values_are_kept_as_null_observations() {
    let set = block_on(
        source(ProviderId::Yahoo)
            .observations(request("AAPL", PeriodKind::Annual, Metric::EpsDiluted)),
    )
    .expect("series present");

    assert_eq!(set.len(), 1);
    assert!(set.observations[0].value.is_none());
}

#[test]
fn period_kind_without_data_is_not_found() {
    let error = block_on(
        source(ProviderId::Yahoo)
            .observations(request("AAPL", PeriodKind::Quarterly, Metric::Revenue)),
    )
    .expect_err("no quarterly data");
    assert_eq!(error.kind(), SourceErrorKind::NotFound);
}

#[test]
fn configured_failures_surface_with_stable_codes() {
    let auth = block_on(
        source(ProviderId::Fmp).observations(request("AAPL", PeriodKind::Annual, Metric::Revenue)),
    )
    .expect_err("failing provider");
    assert_eq!(auth.kind(), SourceErrorKind::AuthFailed);
    assert_eq!(auth.code(), "source.auth_failed");
    assert_eq!(auth.message(), "invalid api key");
    assert!(!auth.retryable());

    let limited = block_on(
        source(ProviderId::Finnhub)
            .observations(request("AAPL", PeriodKind::Quarterly, Metric::Revenue)),
    )
    .expect_err("failing provider");
    assert_eq!(limited.kind(), SourceErrorKind::RateLimited);
    assert!(limited.retryable());
    assert!(!limited.message().is_empty());
}

fn block_on<F>(future: F) -> F::Output
where
    F: Future,
{
    let waker = noop_waker();
    let mut context = Context::from_waker(&waker);
    let mut future = std::pin::pin!(future);

    loop {
        match future.as_mut().poll(&mut context) {
            Poll::Ready(output) => return output,
            Poll::Pending => std::thread::yield_now(),
        }
    }
}

fn noop_waker() -> Waker {
    // SAFETY: The vtable functions never dereference the data pointer and are no-op operations.
    unsafe { Waker::from_raw(noop_raw_waker()) }
}

fn noop_raw_waker() -> RawWaker {
    RawWaker::new(std::ptr::null(), &NOOP_RAW_WAKER_VTABLE)
}

unsafe fn noop_raw_waker_clone(_: *const ()) -> RawWaker {
    noop_raw_waker()
}

unsafe fn noop_raw_waker_wake(_: *const ()) {}

unsafe fn noop_raw_waker_wake_by_ref(_: *const ()) {}

unsafe fn noop_raw_waker_drop(_: *const ()) {}

static NOOP_RAW_WAKER_VTABLE: RawWakerVTable = RawWakerVTable::new(
    noop_raw_waker_clone,
    noop_raw_waker_wake,
    noop_raw_waker_wake_by_ref,
    noop_raw_waker_drop,
);
