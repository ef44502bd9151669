//! This file contains the actix web server wrapper around the functions

mod pages;

use actix_web::{get, middleware, web, App, HttpResponse, HttpServer};
use actix_web::http::StatusCode;
use actix_web::web::Json;
use async_std::sync::Mutex;
use jsentences::config::Config;
use jsentences::database_backend::{AddedSentence, CandidateSentence, KnownSentence, RecommendationLimits, StudyDatabaseBackend};
use jsentences::knowledge::{add_understood_features, already_added, features_in, AddOutcome};
use jsentences::sqlite_database_backend::SqliteDatabaseBackend;
use jsentences::tagger::Tagger;

type StudyDatabase = SqliteDatabaseBackend;
type SharedTagger = Box<dyn Tagger+Send+Sync>;

/// Send a page, making sure the browser never caches it as everything changes each time a sentence is added.
fn html(status:StatusCode,body:&str) -> HttpResponse {
    HttpResponse::build(status)
        .content_type("text/html; charset=UTF-8")
        .insert_header(("Cache-Control","no-cache, no-store, must-revalidate"))
        .insert_header(("Pragma","no-cache"))
        .insert_header(("Expires","0"))
        .body(pages::page(body))
}

fn failure(e:anyhow::Error) -> HttpResponse {
    tracing::error!(error=%e,"request failed");
    html(StatusCode::INTERNAL_SERVER_ERROR,&format!("Error: {}",pages::escape_html(&e.to_string())))
}

#[derive(serde::Deserialize)]
struct AddSentenceQuery {
    jpn : Option<String>,
}

/// Tagging can wait on MeCab for a long time, so it runs on the blocking pool with the database unlocked.
async fn add(study_db:&web::Data<Mutex<StudyDatabase>>,tagger:&web::Data<SharedTagger>,jpn:&str) -> anyhow::Result<AddOutcome> {
    if already_added(&*study_db.lock().await,jpn)? {
        return Ok(AddOutcome::AlreadyAdded);
    }
    let (tagger,text) = (tagger.clone(),jpn.to_string());
    let features = web::block(move||features_in(tagger.get_ref().as_ref(),&text)).await.map_err(|e|anyhow::anyhow!("{}",e))??;
    add_understood_features(&mut *study_db.lock().await,jpn,&features)
}

/// Add a sentence, if given, and list those added so far.
#[get("/add_sentence")]
async fn add_sentence(query:web::Query<AddSentenceQuery>, study_db: web::Data<Mutex<StudyDatabase>>, tagger: web::Data<SharedTagger>) -> HttpResponse {
    let jpn = query.jpn.as_deref().map(|s|s.trim()).filter(|s|!s.is_empty());
    let outcome = match jpn {
        Some(jpn) => match add(&study_db,&tagger,jpn).await {
            Ok(outcome) => Some((jpn,outcome)),
            Err(e) => return failure(e),
        },
        None => None,
    };
    match study_db.lock().await.added_sentences() {
        Ok(added) => html(StatusCode::OK,&pages::add_sentence_body(outcome.as_ref().map(|(jpn,outcome)|(*jpn,outcome)),&added)),
        Err(e) => failure(e),
    }
}

#[get("/sentences_you_should_know")]
async fn sentences_you_should_know(study_db: web::Data<Mutex<StudyDatabase>>) -> HttpResponse {
    match study_db.lock().await.sentences_you_should_know() {
        Ok(sentences) => html(StatusCode::OK,&pages::should_know_body(&sentences)),
        Err(e) => failure(e),
    }
}

#[get("/sentences_you_may_know")]
async fn sentences_you_may_know(study_db: web::Data<Mutex<StudyDatabase>>) -> HttpResponse {
    match study_db.lock().await.sentences_you_may_know(RecommendationLimits::default()) {
        Ok(sentences) => html(StatusCode::OK,&pages::may_know_body(&sentences)),
        Err(e) => failure(e),
    }
}

#[get("/api/added_sentences")]
async fn api_added_sentences(study_db: web::Data<Mutex<StudyDatabase>>) -> Json<Result<Vec<AddedSentence>,String>> {
    Json(study_db.lock().await.added_sentences().map_err(|e|e.to_string()))
}

#[get("/api/sentences_you_should_know")]
async fn api_sentences_you_should_know(study_db: web::Data<Mutex<StudyDatabase>>) -> Json<Result<Vec<KnownSentence>,String>> {
    Json(study_db.lock().await.sentences_you_should_know().map_err(|e|e.to_string()))
}

#[get("/api/sentences_you_may_know")]
async fn api_sentences_you_may_know(study_db: web::Data<Mutex<StudyDatabase>>) -> Json<Result<Vec<CandidateSentence>,String>> {
    Json(study_db.lock().await.sentences_you_may_know(RecommendationLimits::default()).map_err(|e|e.to_string()))
}

async fn not_found() -> HttpResponse {
    html(StatusCode::NOT_FOUND,pages::NOT_FOUND)
}

fn configure(cfg:&mut web::ServiceConfig) {
    cfg.service(add_sentence)
        .service(sentences_you_should_know)
        .service(sentences_you_may_know)
        .service(api_added_sentences)
        .service(api_sentences_you_should_know)
        .service(api_sentences_you_may_know)
        .default_service(web::route().to(not_found));
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let config = Config::from_env();
    config.init_tracing();
    let study_db = web::Data::new(Mutex::new(config.open_database()?));
    let tagger : web::Data<SharedTagger> = web::Data::new(config.open_tagger()?);
    let addr = config.bind_addr();
    tracing::info!(%addr,"Connect to: http://{}/",addr);
    HttpServer::new(move|| {
        App::new()
            .app_data(study_db.clone())
            .app_data(tagger.clone())
            .wrap(middleware::Compress::default())
            .configure(configure)
    })
        .bind(addr)?
        .run()
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test;
    use jsentences::database_backend::SentenceId;
    use jsentences::segmentation::segment_all_sentences;
    use jsentences::tagger::DictionaryTagger;

    fn tagger() -> DictionaryTagger {
        DictionaryTagger::from_strs([
            ("私","名詞,代名詞,一般,*,*,*,私,ワタシ,ワタシ"),
            ("は","助詞,係助詞,*,*,*,*,は,ハ,ワ"),
            ("猫","名詞,一般,*,*,*,*,猫,ネコ,ネコ"),
            ("です","助動詞,*,*,*,特殊・デス,基本形,です,デス,デス"),
            ("が","助詞,格助詞,一般,*,*,*,が,ガ,ガ"),
            ("好き","名詞,形容動詞語幹,*,*,*,*,好き,スキ,スキ"),
        ]).unwrap()
    }

    fn state() -> (web::Data<Mutex<StudyDatabase>>,web::Data<SharedTagger>) {
        let tagger = tagger();
        let mut db = SqliteDatabaseBackend::open_in_memory().unwrap();
        db.insert_sentence(Some(SentenceId(1)),"私は猫です",&["I am a cat.".to_string()]).unwrap();
        db.insert_sentence(Some(SentenceId(2)),"猫が好きです",&["I like cats.".to_string()]).unwrap();
        segment_all_sentences(&mut db,&tagger,1000).unwrap();
        let shared : SharedTagger = Box::new(tagger);
        (web::Data::new(Mutex::new(db)),web::Data::new(shared))
    }

    async fn body_of(resp:actix_web::dev::ServiceResponse) -> String {
        String::from_utf8(test::read_body(resp).await.to_vec()).unwrap()
    }

    #[actix_web::test]
    async fn adding_a_sentence_moves_it_into_the_known_list() {
        let (study_db,tagger) = state();
        let app = test::init_service(App::new().app_data(study_db.clone()).app_data(tagger.clone()).configure(configure)).await;

        let resp = test::call_service(&app,test::TestRequest::get().uri("/sentences_you_should_know").to_request()).await;
        assert!(resp.status().is_success());
        assert!(!body_of(resp).await.contains("私は猫です"));

        let uri = format!("/add_sentence?jpn={}",urlencoding::encode("私は猫です"));
        let resp = test::call_service(&app,test::TestRequest::get().uri(&uri).to_request()).await;
        assert_eq!(resp.headers().get("Cache-Control").unwrap(),"no-cache, no-store, must-revalidate");
        let body = body_of(resp).await;
        assert!(body.contains("was added at level 0 affecting 6 rows."),"{}",body);

        let resp = test::call_service(&app,test::TestRequest::get().uri(&uri).to_request()).await;
        assert!(body_of(resp).await.contains("was already added."));

        let resp = test::call_service(&app,test::TestRequest::get().uri("/sentences_you_should_know").to_request()).await;
        assert!(body_of(resp).await.contains("<tr><td>0</td><td>私は猫です</td><td>I am a cat.</td></tr>"));

        let resp = test::call_service(&app,test::TestRequest::get().uri("/sentences_you_may_know").to_request()).await;
        let body = body_of(resp).await;
        assert!(body.contains("<td>猫が好きです</td>"));
        assert!(!body.contains("<td>私は猫です</td>"));
    }

    #[actix_web::test]
    async fn json_twins() {
        let (study_db,tagger) = state();
        let app = test::init_service(App::new().app_data(study_db.clone()).app_data(tagger.clone()).configure(configure)).await;
        let candidates : Result<Vec<CandidateSentence>,String> = test::call_and_read_body_json(&app,test::TestRequest::get().uri("/api/sentences_you_may_know").to_request()).await;
        assert_eq!(candidates.unwrap().len(),2);
        let added : Result<Vec<AddedSentence>,String> = test::call_and_read_body_json(&app,test::TestRequest::get().uri("/api/added_sentences").to_request()).await;
        assert!(added.unwrap().is_empty());
    }

    #[actix_web::test]
    async fn unknown_paths_point_at_the_tools() {
        let (study_db,tagger) = state();
        let app = test::init_service(App::new().app_data(study_db).app_data(tagger).configure(configure)).await;
        let resp = test::call_service(&app,test::TestRequest::get().uri("/nothing_here").to_request()).await;
        assert_eq!(resp.status(),StatusCode::NOT_FOUND);
        let body = body_of(resp).await;
        assert!(body.contains(pages::NOT_FOUND));
        assert!(body.contains("[<a href=\"/add_sentence\">add_sentence</a>]"));
    }
}
