//! Settings, taken from the environment (and a `.env` file, if the binary loads one).

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use crate::mecab::MecabProcess;
use crate::segmentation::DEFAULT_BATCH_SIZE;
use crate::sqlite_database_backend::SqliteDatabaseBackend;
use crate::tagger::{DictionaryTagger, Tagger, TaggerError};

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub database : PathBuf,
    pub mecab_program : String,
    pub mecab_args : Vec<String>,
    pub tagger_timeout : Duration,
    /// If set, use a [DictionaryTagger] with this lexicon instead of MeCab.
    pub lexicon : Option<PathBuf>,
    pub batch_size : usize,
    pub host : IpAddr,
    pub port : u16,
    pub log_level : String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            database: PathBuf::from(SqliteDatabaseBackend::STD_FILE_NAME),
            mecab_program: "mecab".to_string(),
            mecab_args: vec![],
            tagger_timeout: crate::mecab::DEFAULT_TIMEOUT,
            lexicon: None,
            batch_size: DEFAULT_BATCH_SIZE,
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 8080,
            log_level: "info".to_string(),
        }
    }
}

fn parsed<T:FromStr>(value:Option<String>) -> Option<T> {
    value.and_then(|value|value.trim().parse().ok())
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|name|std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup. Unparseable values are ignored.
    pub fn from_lookup<F:Fn(&str)->Option<String>>(var:F) -> Self {
        let defaults = Config::default();
        Config {
            database: var("JSENTENCES_DB").map(PathBuf::from).unwrap_or(defaults.database),
            mecab_program: var("JSENTENCES_MECAB").unwrap_or(defaults.mecab_program),
            mecab_args: var("JSENTENCES_MECAB_ARGS").map(|args|args.split_whitespace().map(|s|s.to_string()).collect()).unwrap_or(defaults.mecab_args),
            tagger_timeout: parsed(var("JSENTENCES_TAGGER_TIMEOUT_SECS")).map(Duration::from_secs).unwrap_or(defaults.tagger_timeout),
            lexicon: var("JSENTENCES_LEXICON").filter(|s|!s.is_empty()).map(PathBuf::from),
            batch_size: parsed(var("JSENTENCES_BATCH_SIZE")).filter(|&n:&usize|n>0).unwrap_or(defaults.batch_size),
            host: parsed(var("HOST")).unwrap_or(defaults.host),
            port: parsed(var("PORT")).unwrap_or(defaults.port),
            log_level: var("RUST_LOG").unwrap_or(defaults.log_level),
        }
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn open_database(&self) -> anyhow::Result<SqliteDatabaseBackend> {
        SqliteDatabaseBackend::open(&self.database)
    }

    /// Start the configured tagger.
    pub fn open_tagger(&self) -> Result<Box<dyn Tagger+Send+Sync>,TaggerError> {
        let tagger : Box<dyn Tagger+Send+Sync> = match &self.lexicon {
            Some(path) => Box::new(DictionaryTagger::load(path)?),
            None => Box::new(MecabProcess::spawn(&self.mecab_program,self.mecab_args.as_slice(),self.tagger_timeout)?),
        };
        Ok(tagger)
    }

    /// Send logs to stderr, filtered by `log_level`.
    pub fn init_tracing(&self) {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::try_new(&self.log_level).unwrap_or_else(|_| EnvFilter::new("info")))
            .with_writer(std::io::stderr)
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars:&[(&str,&str)]) -> Config {
        let vars : HashMap<String,String> = vars.iter().map(|(k,v)|(k.to_string(),v.to_string())).collect();
        Config::from_lookup(|name|vars.get(name).cloned())
    }

    #[test]
    fn defaults() {
        assert_eq!(config(&[]),Config::default());
        assert_eq!(Config::default().bind_addr().to_string(),"127.0.0.1:8080");
    }

    #[test]
    fn overrides() {
        let c = config(&[("JSENTENCES_DB","/tmp/j.sqlite"),("JSENTENCES_MECAB_ARGS"," -d /usr/lib/mecab/dic/ipadic  -b 65536"),("JSENTENCES_TAGGER_TIMEOUT_SECS","5"),("JSENTENCES_LEXICON","words.csv"),("PORT","8091"),("HOST","0.0.0.0")]);
        assert_eq!(c.database,PathBuf::from("/tmp/j.sqlite"));
        assert_eq!(c.mecab_args,vec!["-d","/usr/lib/mecab/dic/ipadic","-b","65536"]);
        assert_eq!(c.tagger_timeout,Duration::from_secs(5));
        assert_eq!(c.lexicon,Some(PathBuf::from("words.csv")));
        assert_eq!(c.bind_addr().to_string(),"0.0.0.0:8091");
    }

    #[test]
    fn bad_numbers_fall_back() {
        let c = config(&[("PORT","eighty"),("JSENTENCES_BATCH_SIZE","0"),("JSENTENCES_TAGGER_TIMEOUT_SECS","-1")]);
        assert_eq!(c.port,8080);
        assert_eq!(c.batch_size,DEFAULT_BATCH_SIZE);
        assert_eq!(c.tagger_timeout,crate::mecab::DEFAULT_TIMEOUT);
    }
}
