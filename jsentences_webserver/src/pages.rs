//! The HTML pages. Deliberately plain: preformatted text and tables, green on black.

use std::fmt::Write;
use jsentences::database_backend::{AddedSentence, CandidateSentence, KnownSentence};
use jsentences::knowledge::AddOutcome;

/// The pages listed at the top of every page.
pub const TOOLS : &[&str] = &["add_sentence","sentences_you_may_know","sentences_you_should_know"];

pub const NOT_FOUND : &str = "Select one of the tools above!";

pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

/// Wrap the body of a tool in the common header.
pub fn page(body:&str) -> String {
    let mut res = String::from(r#"<html><body bgcolor="Black" text="Lime" link="Lime" vlink="Lime"><pre>Tools:"#);
    for tool in TOOLS {
        let _ = write!(res," [<a href=\"/{tool}\">{tool}</a>]");
    }
    res.push_str("<hr>");
    res.push_str(body);
    res.push_str("</pre></body></html>");
    res
}

fn translations(translations:&[String]) -> String {
    translations.iter().map(|t|escape_html(t)).collect::<Vec<_>>().join("<br>")
}

/// The result of trying to add a sentence, if one was given, then a form to add another, then what has been added so far.
pub fn add_sentence_body(result:Option<(&str,&AddOutcome)>,added:&[AddedSentence]) -> String {
    let mut res = String::new();
    if let Some((japanese,outcome)) = result {
        let japanese = escape_html(japanese);
        let _ = match outcome {
            AddOutcome::AlreadyAdded => write!(res,"The sentence: {japanese}\nwas already added.\n\n"),
            AddOutcome::NothingNew => write!(res,"The sentence: {japanese}\ncontains nothing you did not already know, so no level was added.\n\n"),
            AddOutcome::Added { level, rows } => write!(res,"The sentence {japanese}\nwas added at level {level} affecting {rows} rows.\n\n"),
        };
    }
    res.push_str("Add new grammatically correct japanese sentence, it doesn't have to\n\
                  be from any particular source as long as it is perfectly well written:\n\
                  <form action=add_sentence method=get>    <input type=text name=jpn><input type=submit value=Add></form>\n");
    res.push_str("Previously added sentences:\n");
    for sentence in added {
        let _ = writeln!(res,"{:5}: {}",sentence.level,escape_html(&sentence.japanese));
    }
    res
}

pub fn should_know_body(sentences:&[KnownSentence]) -> String {
    let mut res = String::from("Sentences you should know at this point, sorted by level.  Each time\n\
                                you add a new sentence, this list will gradually grow:\n\n\
                                <table border=1><tr><th>Level</th><th>Japanese</th><th>Translations</th></tr>");
    for sentence in sentences {
        let _ = write!(res,"<tr><td>{}</td><td>{}</td><td>{}</td></tr>",sentence.level,escape_html(&sentence.japanese),translations(&sentence.translations));
    }
    res.push_str("</table>");
    res
}

pub fn may_know_body(sentences:&[CandidateSentence]) -> String {
    let mut res = String::from("Sentences you may know at this point, sorted by how many new words (with associated grammar points)\n\
                                you would need to know (d) and how much it might help to learn them (frequency).\n\
                                There is also an [Add] button that will mark that sentence as learned.\n\
                                So make sure you understand that sentence before clicking it!:\n\n\
                                <table border=1><tr><th>Add</th><th>Frequency</th><th>d</th><th>Japanese</th><th>Translations</th></tr>");
    for sentence in sentences {
        let _ = write!(res,"<tr><td>[<a href=\"add_sentence?jpn={}\">Add</a>]</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                       urlencoding::encode(&sentence.japanese),sentence.frequency,sentence.unknown_words,escape_html(&sentence.japanese),translations(&sentence.translations));
    }
    res.push_str("</table>");
    res
}
