//! Command line access to the sentence database.
//! Settings (database file, tagger) come from the environment; see [jsentences::config::Config].

use std::path::PathBuf;
use clap::{Parser, Subcommand};
use jsentences::config::Config;
use jsentences::database_backend::{RecommendationLimits, SentenceId, StudyDatabaseBackend};
use jsentences::knowledge::{add_understood_sentence, AddOutcome};
use jsentences::segmentation::segment_all_sentences;
use jsentences::sqlite_database_backend::SqliteDatabaseBackend;
use jsentences::tagger::Tagger;

#[derive(Parser, Debug)]
#[command(name = "jsentences", about = "Learn Japanese one understood sentence at a time")]
struct Args {
    #[command(subcommand)]
    command : Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the database tables if they do not exist.
    Init,
    /// Add sentences to the corpus from a tab separated file: id, japanese, then any number of translations.
    Import { path : PathBuf },
    /// Run the tagger over all sentences not yet segmented.
    Mecabize {
        /// Commit after this many sentences.
        #[arg(long)]
        batch_size : Option<usize>,
    },
    /// Given a new sentence that you understand, a new level is created and all known words are marked in the database.
    AddSentence {
        /// A grammatically correct, understood japanese sentence.
        sentence : String,
    },
    /// Recompute how often each unknown feature occurs.
    Recount,
    /// Show how the tagger splits some text.
    Tag { text : String },
    /// List the sentences whose words are all known, by level.
    ShouldKnow,
    /// List the sentences with a few unknown words, most useful first.
    MayKnow,
    /// Forget everything except the corpus itself.
    Reset,
}

fn import(db:&mut SqliteDatabaseBackend,path:&PathBuf) -> anyhow::Result<usize> {
    let mut reader = csv::ReaderBuilder::new().delimiter(b'\t').quoting(false).flexible(true).has_headers(false).from_path(path)?;
    let mut count = 0;
    for result in reader.records() {
        let record = result?;
        let (Some(id),Some(japanese)) = (record.get(0),record.get(1)) else {
            anyhow::bail!("Line {} in wrong format",count+1);
        };
        let id = SentenceId(id.trim().parse()?);
        let translations : Vec<String> = record.iter().skip(2).filter(|t|!t.is_empty()).map(|t|t.to_string()).collect();
        db.insert_sentence(Some(id),japanese,&translations)?;
        count+=1;
    }
    Ok(count)
}

fn explain(tagger:&dyn Tagger,text:&str) -> anyhow::Result<()> {
    println!("Parsing {}",text);
    for token in tagger.tag(text)? {
        println!(" {}\t{}",token.surface,token.normalized_feature());
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let config = Config::from_env();
    config.init_tracing();
    let args = Args::parse();
    let mut db = config.open_database()?;
    match args.command {
        Command::Init => { println!("Database {} ready",config.database.display()); }
        Command::Import { path } => {
            let count = import(&mut db,&path)?;
            println!("Imported {} sentences",count);
        }
        Command::Mecabize { batch_size } => {
            let tagger = config.open_tagger()?;
            let report = segment_all_sentences(&mut db,tagger.as_ref(),batch_size.unwrap_or(config.batch_size))?;
            println!("Segmented {} sentences into {} words; {} distinct unknown features",report.sentences,report.occurrences,report.features_counted);
        }
        Command::AddSentence { sentence } => {
            let tagger = config.open_tagger()?;
            match add_understood_sentence(&mut db,tagger.as_ref(),&sentence)? {
                AddOutcome::AlreadyAdded => println!("The sentence {} was already added.",sentence),
                AddOutcome::NothingNew => println!("The sentence {} contains nothing new.",sentence),
                AddOutcome::Added { level, rows } => println!("Updated {} words with new level {}",rows,level),
            }
        }
        Command::Recount => {
            let counted = db.rebuild_feature_frequency()?;
            println!("{} distinct unknown features",counted);
        }
        Command::Tag { text } => {
            let tagger = config.open_tagger()?;
            explain(tagger.as_ref(),&text)?;
        }
        Command::ShouldKnow => {
            for sentence in db.sentences_you_should_know()? {
                println!("{}\t{}\t{}",sentence.level,sentence.japanese,sentence.translations.join(" / "));
            }
        }
        Command::MayKnow => {
            for sentence in db.sentences_you_may_know(RecommendationLimits::default())? {
                println!("{}\t{}\t{}\t{}",sentence.frequency,sentence.unknown_words,sentence.japanese,sentence.translations.join(" / "));
            }
        }
        Command::Reset => {
            db.clear_all_reinitialize()?;
            println!("Cleared everything but the sentences");
        }
    }
    Ok(())
}
