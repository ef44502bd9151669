//! A long running MeCab process, fed through its stdin and read through its stdout.
//!
//! Starting MeCab loads its dictionary, which is slow, so one process is kept for the life of
//! the [MecabProcess] and killed when it is dropped.
//!
//! Protocol: each input line produces zero or more `surface<TAB>features` lines followed by `EOS`.

use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::Mutex;
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::Duration;
use crate::features::FeatureVector;
use crate::tagger::{Tagger, TaggerError, Token};

pub const DEFAULT_TIMEOUT : Duration = Duration::from_secs(30);
const END_OF_SENTENCE : &str = "EOS";

struct MecabPipe {
    child : Child,
    stdin : Option<ChildStdin>,
    lines : Receiver<std::io::Result<String>>,
    broken : bool,
}

pub struct MecabProcess {
    program : String,
    pipe : Mutex<MecabPipe>,
    timeout : Duration,
}

impl MecabProcess {
    /// Start `program` with the given arguments. Every wait for an output line is limited to `timeout`.
    pub fn spawn<S:AsRef<str>>(program:&str,args:&[S],timeout:Duration) -> Result<Self,TaggerError> {
        let mut child = Command::new(program)
            .args(args.iter().map(|a|a.as_ref()))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source|TaggerError::Spawn{program:program.to_string(),source})?;
        let stdin = child.stdin.take();
        let stdout = child.stdout.take().ok_or(TaggerError::SubprocessDied)?;
        let (sender,lines) = std::sync::mpsc::channel();
        // stdout is read on its own thread so that waits can be bounded.
        std::thread::Builder::new().name("mecab-reader".to_string()).spawn(move||{
            for line in BufReader::new(stdout).lines() {
                let failed = line.is_err();
                if sender.send(line).is_err() || failed { break; }
            }
        })?;
        tracing::info!(program,pid=child.id(),"started tagger process");
        Ok(MecabProcess{
            program : program.to_string(),
            pipe : Mutex::new(MecabPipe{ child, stdin, lines, broken:false }),
            timeout,
        })
    }
}

impl MecabPipe {
    fn read_line(&mut self,timeout:Duration) -> Result<String,TaggerError> {
        match self.lines.recv_timeout(timeout) {
            Ok(line) => Ok(line?),
            Err(RecvTimeoutError::Timeout) => Err(TaggerError::Timeout(timeout)),
            Err(RecvTimeoutError::Disconnected) => Err(TaggerError::SubprocessDied),
        }
    }

    fn converse(&mut self,text:&str,timeout:Duration) -> Result<Vec<Vec<Token>>,TaggerError> {
        let mut input = text.to_string();
        input.push('\n');
        let line_count = input.matches('\n').count();
        let stdin = self.stdin.as_mut().ok_or(TaggerError::SubprocessDied)?;
        stdin.write_all(input.as_bytes()).and_then(|_|stdin.flush()).map_err(|e| match e.kind() {
            std::io::ErrorKind::BrokenPipe => TaggerError::SubprocessDied,
            _ => TaggerError::Io(e),
        })?;
        let mut res = Vec::with_capacity(line_count);
        let mut current = vec![];
        while res.len()<line_count {
            let line = self.read_line(timeout)?;
            let line = line.strip_suffix('\r').unwrap_or(&line);
            if line==END_OF_SENTENCE {
                res.push(std::mem::take(&mut current));
            } else if let Some((surface,features)) = line.split_once('\t') {
                current.push(Token{ surface: surface.to_string(), features: FeatureVector::parse(features)? });
            } else {
                return Err(TaggerError::Malformed(line.to_string()));
            }
        }
        Ok(res)
    }
}

impl Tagger for MecabProcess {
    fn tag_lines(&self, text: &str) -> Result<Vec<Vec<Token>>, TaggerError> {
        let mut pipe = self.pipe.lock().map_err(|_|TaggerError::Broken)?;
        if pipe.broken { return Err(TaggerError::Broken); }
        let res = pipe.converse(text,self.timeout);
        if let Err(e) = &res {
            // we may be part way through a response, so nothing that follows can be trusted.
            tracing::error!(program=%self.program,error=%e,"tagger failed");
            pipe.broken=true;
        }
        res
    }
}

impl Drop for MecabPipe {
    fn drop(&mut self) {
        self.stdin.take();
        if let Err(e) = self.child.kill() { tracing::debug!(error=%e,"tagger process already gone"); }
        let _ = self.child.wait();
    }
}

#[cfg(all(test,unix))]
mod tests {
    use super::*;

    /// A stand in for mecab: every input line becomes a single unknown word.
    const ECHO_TAGGER : &str = r#"while IFS= read -r line; do if [ -n "$line" ]; then printf '%s\t名詞,一般,*,*,*,*,*\n' "$line"; fi; echo EOS; done"#;

    fn sh(script:&str,timeout:Duration) -> MecabProcess {
        MecabProcess::spawn("sh",&["-c",script],timeout).unwrap()
    }

    #[test]
    fn reads_one_eos_per_line() {
        let tagger = sh(ECHO_TAGGER,DEFAULT_TIMEOUT);
        let lines = tagger.tag_lines("猫です\n\n犬").unwrap();
        assert_eq!(lines.len(),3);
        assert_eq!(lines[0].len(),1);
        assert_eq!(lines[0][0].surface,"猫です");
        assert!(lines[1].is_empty());
        assert_eq!(lines[2][0].normalized_feature(),"名詞,一般,*,*,*,*,*犬");
        // the process is reused.
        let tokens = tagger.tag("もう一度").unwrap();
        assert_eq!(tokens.len(),1);
        assert_eq!(tokens[0].surface,"もう一度");
    }

    #[test]
    fn several_tokens_per_line() {
        let script = r#"while IFS= read -r line; do printf '猫\t名詞,一般,*,*,*,*,猫,ネコ,ネコ\nです\t助動詞,*,*,*,特殊・デス,基本形,です,デス,デス\nEOS\n'; done"#;
        let tagger = sh(script,DEFAULT_TIMEOUT);
        let tokens = tagger.tag("猫です").unwrap();
        assert_eq!(tokens.iter().map(|t|t.surface.as_str()).collect::<Vec<_>>(),vec!["猫","です"]);
        assert_eq!(tokens[1].features.lemma(),Some("です"));
    }

    #[test]
    fn death_is_fatal() {
        let tagger = sh("read -r line; exit 0",DEFAULT_TIMEOUT);
        assert!(matches!(tagger.tag("猫"),Err(TaggerError::SubprocessDied)));
        assert!(matches!(tagger.tag("猫"),Err(TaggerError::Broken)));
    }

    #[test]
    fn malformed_output_is_fatal() {
        let tagger = sh("while read -r line; do echo nonsense; done",DEFAULT_TIMEOUT);
        match tagger.tag("猫") {
            Err(TaggerError::Malformed(line)) => assert_eq!(line,"nonsense"),
            other => panic!("expected malformed line, got {:?}",other),
        }
        assert!(matches!(tagger.tag("猫"),Err(TaggerError::Broken)));
    }

    #[test]
    fn hung_tagger_times_out() {
        let tagger = sh("while read -r line; do sleep 30; done",Duration::from_millis(200));
        assert!(matches!(tagger.tag("猫"),Err(TaggerError::Timeout(_))));
    }

    #[test]
    fn missing_program() {
        assert!(matches!(MecabProcess::spawn::<&str>("/nonexistent/mecab",&[],DEFAULT_TIMEOUT),Err(TaggerError::Spawn{..})));
    }
}
