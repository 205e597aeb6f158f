//! Verify build/parse and aggregation against JSON test vectors in `test-vectors/`.
//!
//! Search vectors describe inputs, expected requests, simulated responses and
//! expected parse results. Aggregation vectors describe the page sequence a
//! server answers with and the request budget and outcome the paginator must
//! arrive at.

use std::cell::Cell;

use classifieds_core::{
    ApiError, HttpMethod, HttpRequest, HttpResponse, MarketClient, PageMeta, SearchOptions,
    SearchQuery, StopReason,
};
use serde_json::{json, Value};

const BASE_URL: &str = "http://localhost:3000";

fn client() -> MarketClient {
    MarketClient::new(BASE_URL)
}

/// Parse the method string from test vectors into `HttpMethod`.
fn parse_method(s: &str) -> HttpMethod {
    match s {
        "GET" => HttpMethod::Get,
        "POST" => HttpMethod::Post,
        "PUT" => HttpMethod::Put,
        "DELETE" => HttpMethod::Delete,
        other => panic!("unknown method: {other}"),
    }
}

fn simulated(case: &Value) -> HttpResponse {
    let sim = &case["simulated_response"];
    HttpResponse {
        status: sim["status"].as_u64().unwrap() as u16,
        headers: Vec::new(),
        body: sim["body"].as_str().unwrap().to_string(),
    }
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

#[test]
fn search_test_vectors() {
    let raw = include_str!("../../test-vectors/search.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    let c = client();
    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let input = &case["input"];

        let mut options = SearchOptions::default();
        for (key, value) in input["extra"].as_object().unwrap() {
            options = options.with_extra(key, value.as_str().unwrap());
        }
        let query = SearchQuery::new(input["term"].as_str().unwrap())
            .category(input["category_id"].as_u64())
            .page(input["page"].as_u64().unwrap() as u32)
            .per_page(input["per_page"].as_u64().unwrap() as u32)
            .options(options);

        // Verify build
        let expected_req = &case["expected_request"];
        let req = c.build_search(&query);
        let expected_method = parse_method(expected_req["method"].as_str().unwrap());
        assert_eq!(req.method, expected_method, "{name}: method");
        let expected_path = format!("{BASE_URL}{}", expected_req["path"].as_str().unwrap());
        assert_eq!(req.path, expected_path, "{name}: path");
        let expected_query: Vec<(String, String)> =
            serde_json::from_value(expected_req["query"].clone()).unwrap();
        assert_eq!(req.query, expected_query, "{name}: query");
        assert!(req.body.is_none(), "{name}: body should be None");

        // Verify parse
        let result = c.parse_search(simulated(case));
        if let Some(expected_error) = case.get("expected_error") {
            let err = result.unwrap_err();
            match expected_error.as_str().unwrap() {
                "Remote" => {
                    assert!(matches!(err, ApiError::Remote { .. }), "{name}: expected Remote")
                }
                "Decode" => assert!(matches!(err, ApiError::Decode(_)), "{name}: expected Decode"),
                other => panic!("{name}: unknown expected_error: {other}"),
            }
        } else {
            let page = result.unwrap();
            let expected = &case["expected_result"];
            let ids: Vec<u64> = page.records.iter().map(|r| r["id"].as_u64().unwrap()).collect();
            let expected_ids: Vec<u64> =
                serde_json::from_value(expected["record_ids"].clone()).unwrap();
            assert_eq!(ids, expected_ids, "{name}: record ids");
            let expected_meta: PageMeta = serde_json::from_value(expected["meta"].clone()).unwrap();
            assert_eq!(page.meta, expected_meta, "{name}: meta");
        }
    }
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Answers search requests from a scripted page list, counting requests.
struct ScriptedPages<'a> {
    case: &'a Value,
    requests: Cell<u32>,
}

impl classifieds_core::Transport for ScriptedPages<'_> {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        self.requests.set(self.requests.get() + 1);
        let page: usize = request.query_param("page").unwrap().parse().unwrap();
        let scripted = &self.case["pages"][page - 1];
        let status = scripted["status"].as_u64().unwrap() as u16;
        if status != 200 {
            return Ok(HttpResponse {
                status,
                headers: Vec::new(),
                body: "error".to_string(),
            });
        }

        let count = scripted["count"].as_u64().unwrap();
        let per_page = self.case["per_page"].as_u64().unwrap();
        let first_id = (page as u64 - 1) * per_page + 1;
        let data: Vec<Value> = (first_id..first_id + count).map(|id| json!({ "id": id })).collect();
        let body = json!({
            "data": data,
            "meta": {
                "total": self.case["total"],
                "last_page": self.case["last_page"],
                "current_page": page,
                "per_page": per_page,
            }
        });
        Ok(HttpResponse {
            status,
            headers: Vec::new(),
            body: body.to_string(),
        })
    }
}

fn stop_name(stop: StopReason) -> &'static str {
    match stop {
        StopReason::Empty => "Empty",
        StopReason::Exhausted => "Exhausted",
        StopReason::ShortPage { .. } => "ShortPage",
        StopReason::Failed { .. } => "Failed",
        StopReason::Cancelled { .. } => "Cancelled",
        StopReason::DeadlineExceeded { .. } => "DeadlineExceeded",
    }
}

#[test]
fn aggregate_test_vectors() {
    let raw = include_str!("../../test-vectors/aggregate.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    let c = client();
    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let transport = ScriptedPages {
            case,
            requests: Cell::new(0),
        };
        let query = SearchQuery::new("vector").per_page(case["per_page"].as_u64().unwrap() as u32);
        let max_pages = case["max_pages"].as_u64().map(|n| n as u32);

        let result = c.search_all(&transport, &query, max_pages).unwrap();

        let expected_requests = case["expected_requests"].as_u64().unwrap();
        let expected_records = case["expected_records"].as_u64().unwrap();
        assert_eq!(u64::from(transport.requests.get()), expected_requests, "{name}: requests");
        assert_eq!(u64::from(result.requests), expected_requests, "{name}: counted requests");
        assert_eq!(result.len() as u64, expected_records, "{name}: records");
        assert_eq!(stop_name(result.stop), case["expected_stop"].as_str().unwrap(), "{name}: stop");

        let ids: Vec<u64> = result.records.iter().map(|r| r["id"].as_u64().unwrap()).collect();
        assert!(ids.windows(2).all(|w| w[0] < w[1]), "{name}: ascending page order");
    }
}
