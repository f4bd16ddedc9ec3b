use std::collections::HashMap;

use axum::extract::{Path, Query};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use taxopeek_core::{PopupContent, PreviewSubject, ResolutionResult};
use taxopeek_sources::{
    EncyclopediaSource, KnowledgeBaseSource, SourceOverrides, WikidataSource, WikipediaSource,
    load_resolver_from_config,
};
use tempfile::tempdir;

const LION_BODY: &str = "<div class=\"mw-parser-output\"><table class=\"infobox\"><tr><td>Lion \
    infobox text that is long enough to count.</td></tr></table><p>The lion (<i>Panthera leo</i>) \
    is a large <a href=\"/wiki/Cat\">cat</a> of the genus Panthera.<sup class=\"reference\">[3]</sup> \
    It has a muscular, broad-chested body. It has a short, rounded head.</p></div>";

async fn wiki_api(Query(params): Query<HashMap<String, String>>) -> Response {
    let param = |key: &str| params.get(key).map(String::as_str).unwrap_or_default();

    match param("action") {
        "parse" => match param("page") {
            "Panthera leo" | "Lion" => Json(json!({
                "parse": {"title": "Panthera leo", "pageid": 36896, "text": LION_BODY}
            }))
            .into_response(),
            "Broken" => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
            _ => Json(json!({
                "error": {"code": "missingtitle", "info": "The page you specified doesn't exist."}
            }))
            .into_response(),
        },
        "wbsearchentities" => match param("search") {
            "Acer campestre" | "Broken" => Json(json!({
                "search": [{"id": "Q158785", "label": "field maple"}, {"id": "Q2", "label": "x"}]
            }))
            .into_response(),
            _ => Json(json!({"search": []})).into_response(),
        },
        "wbgetentities" if param("ids") == "Q158785" => Json(json!({
            "entities": {
                "Q158785": {
                    "id": "Q158785",
                    "labels": {"en": {"language": "en", "value": "field maple"}},
                    "descriptions": {"en": {"language": "en", "value": "species of plant"}},
                    "claims": {"P18": [{"mainsnak": {"datavalue": {"value": "Acer campestre 001.jpg"}}}]}
                }
            }
        }))
        .into_response(),
        "wbgetentities" => {
            let id = param("ids");
            Json(json!({"entities": {id: {"id": id, "missing": ""}}})).into_response()
        }
        _ => StatusCode::BAD_REQUEST.into_response(),
    }
}

async fn page_summary(Path(title): Path<String>) -> Response {
    if title == "Panthera leo" {
        Json(json!({
            "title": "Panthera leo",
            "thumbnail": {"source": "https://upload.wikimedia.org/lion.jpg", "width": 320}
        }))
        .into_response()
    } else {
        StatusCode::NOT_FOUND.into_response()
    }
}

async fn spawn_reference_server() -> String {
    let app = Router::new()
        .route("/w/api.php", get(wiki_api))
        .route("/api/rest_v1/page/summary/{title}", get(page_summary));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });

    format!("http://{addr}")
}

fn overrides_for(base: &str) -> SourceOverrides {
    SourceOverrides {
        provider: None,
        wikipedia_base: Some(base.to_owned()),
        wikidata_base: Some(base.to_owned()),
    }
}

#[tokio::test]
async fn wikipedia_source_reads_article_and_thumbnail() {
    let base = spawn_reference_server().await;
    let source = WikipediaSource::new(reqwest::Client::new(), &base);

    let article = source
        .article_markup("Panthera leo")
        .await
        .expect("article request")
        .expect("article present");
    let summary = source
        .page_summary("Panthera leo")
        .await
        .expect("summary request")
        .expect("summary present");

    assert_eq!(article.title, "Panthera leo");
    assert!(article.html.contains("mw-parser-output"));
    assert_eq!(
        summary.thumbnail_url.as_deref(),
        Some("https://upload.wikimedia.org/lion.jpg")
    );
}

#[tokio::test]
async fn wikipedia_source_reports_missing_pages_as_empty() {
    let base = spawn_reference_server().await;
    let source = WikipediaSource::new(reqwest::Client::new(), &base);

    let article = source
        .article_markup("Xyzzyplasia nonexistus")
        .await
        .expect("article request");
    let summary = source
        .page_summary("Xyzzyplasia nonexistus")
        .await
        .expect("summary request");
    let broken = source.article_markup("Broken").await;

    assert!(article.is_none());
    assert!(summary.is_none());
    assert!(broken.is_err());
}

#[tokio::test]
async fn wikidata_source_searches_and_reads_entities() {
    let base = spawn_reference_server().await;
    let source = WikidataSource::new(reqwest::Client::new(), &base, "en");

    let hits = source
        .search_entities("Acer campestre")
        .await
        .expect("search request");
    let entity = source
        .entity("Q158785")
        .await
        .expect("entity request")
        .expect("entity present");
    let missing = source.entity("Q999999999").await.expect("entity request");

    assert_eq!(hits, vec!["Q158785", "Q2"]);
    assert_eq!(entity.label.as_deref(), Some("field maple"));
    assert_eq!(entity.image_file.as_deref(), Some("Acer campestre 001.jpg"));
    assert!(missing.is_none());
}

#[tokio::test]
async fn full_chain_resolves_article_with_absolute_links() {
    let base = spawn_reference_server().await;
    let temp = tempdir().expect("tempdir");
    let loaded = load_resolver_from_config(temp.path(), overrides_for(&base)).expect("load");

    let result = loaded
        .resolver
        .resolve_once(&PreviewSubject::from("Lion"))
        .await
        .into_result()
        .expect("resolved");

    let ResolutionResult::ArticleSummary {
        title,
        snippet,
        image_url,
        canonical_url,
    } = result
    else {
        panic!("expected article summary, got {result:?}");
    };
    assert_eq!(title, "Panthera leo");
    assert_eq!(canonical_url, format!("{base}/wiki/Panthera%20leo"));
    // "Lion" has no summary of its own; the thumbnail lookup uses the requested title.
    assert_eq!(image_url, None);
    assert_eq!(
        snippet.as_html(),
        format!(
            "The lion (<i>Panthera leo</i>) is a large <a href=\"{base}/wiki/Cat\">cat</a> of the \
             genus Panthera. It has a muscular, broad-chested body."
        )
    );
}

#[tokio::test]
async fn full_chain_falls_back_to_entity_when_article_errors() {
    let base = spawn_reference_server().await;
    let temp = tempdir().expect("tempdir");
    let loaded = load_resolver_from_config(temp.path(), overrides_for(&base)).expect("load");

    let result = loaded
        .resolver
        .resolve_once(&PreviewSubject::from("Broken"))
        .await
        .into_result()
        .expect("resolved");

    assert_eq!(
        result,
        ResolutionResult::EntitySummary {
            label: "field maple".to_owned(),
            description: "species of plant".to_owned(),
            image_url: Some(
                "https://commons.wikimedia.org/wiki/Special:FilePath/Acer%20campestre%20001.jpg?width=300"
                    .to_owned()
            ),
            canonical_url: format!("{base}/wiki/Q158785"),
        }
    );
}

#[tokio::test]
async fn unknown_name_renders_no_entry_with_hidden_footer() {
    let base = spawn_reference_server().await;
    let temp = tempdir().expect("tempdir");
    let loaded = load_resolver_from_config(temp.path(), overrides_for(&base)).expect("load");

    let result = loaded
        .resolver
        .resolve_once(&PreviewSubject::from("Xyzzyplasia nonexistus"))
        .await
        .into_result()
        .expect("resolved");
    let content = PopupContent::from_result(&result);

    assert_eq!(
        result,
        ResolutionResult::NoEntry {
            subject: PreviewSubject::from("Xyzzyplasia nonexistus"),
            wikispecies_url: "https://species.wikimedia.org/wiki/Xyzzyplasia%20nonexistus"
                .to_owned(),
        }
    );
    assert!(content.footer.is_none());
    assert!(content.image.is_none());
    assert!(content.body_html.contains(
        "<a href=\"https://species.wikimedia.org/wiki/Xyzzyplasia%20nonexistus\" target=\"_blank\">"
    ));
}
