//! Reading question records and earlier-stage results from disk.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tap::Pipe;

use crate::results::{Entry, ErrorRecord, FallbackRecord, ReasoningResult};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("malformed record on line {line}: {source}")]
    MalformedLine {
        line: usize,
        source: serde_json::Error,
    },
    #[error("requested {requested} records but the dataset holds only {available}")]
    TooFewRecords { requested: usize, available: usize },
    #[error("{} is not a JSON array of results: {source}", path.display())]
    MalformedResults {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("malformed result at position {position}: {source}")]
    MalformedEntry {
        position: usize,
        source: serde_json::Error,
    },
}

pub type Result<T> = core::result::Result<T, Error>;

/// Label of one of the four answer options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum AnswerLabel {
    A,
    B,
    C,
    D,
}

/// Words a model tends to put in front of the letter it picked.
const LABEL_PREFIXES: [&str; 5] = ["final", "answer", "option", "choice", "is"];

impl AnswerLabel {
    pub const ALL: [AnswerLabel; 4] = [AnswerLabel::A, AnswerLabel::B, AnswerLabel::C, AnswerLabel::D];

    pub fn as_str(&self) -> &'static str {
        match self {
            AnswerLabel::A => "A",
            AnswerLabel::B => "B",
            AnswerLabel::C => "C",
            AnswerLabel::D => "D",
        }
    }

    fn from_token(token: &str) -> Option<Self> {
        match token {
            "A" => Some(AnswerLabel::A),
            "B" => Some(AnswerLabel::B),
            "C" => Some(AnswerLabel::C),
            "D" => Some(AnswerLabel::D),
            _ => None,
        }
    }

    /// Pull a label out of free model text such as `"B"`, `"b."`,
    /// `"B) Furosemide"` or `"Final answer: C"`.
    ///
    /// A lowercase letter counts only when it is the whole value, since in
    /// prose it is usually the article. Text naming more than one label, such
    /// as the schema placeholder `"A/B/C/D"` or `"A or B"`, yields `None`.
    pub fn extract(text: &str) -> Option<Self> {
        let trimmed = text.trim();
        let bare = trimmed
            .strip_suffix(|c: char| c == '.' || c == ')')
            .unwrap_or(trimmed);
        if let Some(label) = Self::from_token(&bare.to_ascii_uppercase()) {
            return Some(label);
        }
        let mut tokens = trimmed
            .split(|c: char| !c.is_ascii_alphanumeric())
            .filter(|t| !t.is_empty())
            .skip_while(|t| LABEL_PREFIXES.iter().any(|p| t.eq_ignore_ascii_case(p)));
        let label = Self::from_token(tokens.next()?)?;
        if tokens.any(|t| Self::from_token(t).is_some()) {
            return None;
        }
        Some(label)
    }
}

impl std::fmt::Display for AnswerLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepts any string for a label field; text that names no option becomes `None`.
pub(crate) fn deserialize_lenient_label<'de, D>(
    deserializer: D,
) -> core::result::Result<Option<AnswerLabel>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(AnswerLabel::extract))
}

/// The four answer options of a question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Options {
    #[serde(rename = "A")]
    pub a: String,
    #[serde(rename = "B")]
    pub b: String,
    #[serde(rename = "C")]
    pub c: String,
    #[serde(rename = "D")]
    pub d: String,
}

impl Options {
    pub fn get(&self, label: AnswerLabel) -> &str {
        match label {
            AnswerLabel::A => &self.a,
            AnswerLabel::B => &self.b,
            AnswerLabel::C => &self.c,
            AnswerLabel::D => &self.d,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (AnswerLabel, &str)> {
        AnswerLabel::ALL.into_iter().map(move |label| (label, self.get(label)))
    }

    /// Label of the option whose text equals `text`, ignoring surrounding
    /// whitespace and case.
    pub fn label_of(&self, text: &str) -> Option<AnswerLabel> {
        let text = text.trim();
        self.iter()
            .find(|(_, option)| option.trim().eq_ignore_ascii_case(text))
            .map(|(label, _)| label)
    }
}

/// One multiple-choice question from the dataset.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct QuestionRecord {
    /// 1-based position in the dataset.
    #[serde(skip)]
    pub id: u64,
    pub question: String,
    pub options: Options,
    /// Ground truth, either a label or the text of the correct option.
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub answer_idx: Option<String>,
    #[serde(default)]
    pub meta_info: Option<String>,
}

impl QuestionRecord {
    pub fn ground_truth(&self) -> Option<AnswerLabel> {
        if let Some(label) = self.answer_idx.as_deref().and_then(AnswerLabel::extract) {
            return Some(label);
        }
        let answer = self.answer.as_deref()?;
        self.options
            .label_of(answer)
            .or_else(|| AnswerLabel::extract(answer).filter(|_| answer.trim().len() <= 2))
    }
}

/// Read question records from a line-delimited JSON file.
///
/// With a `limit`, only the first `limit` records are read and a shorter
/// dataset is an error. Whitespace-only lines are skipped.
pub fn read_questions(path: impl AsRef<Path>, limit: Option<usize>) -> Result<Vec<QuestionRecord>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| Error::Open {
        path: path.to_owned(),
        source,
    })?;
    let mut records = Vec::new();
    for (idx, line) in BufReader::new(file).lines().enumerate() {
        if limit.is_some_and(|n| records.len() >= n) {
            break;
        }
        let line = line.map_err(|source| Error::Read {
            path: path.to_owned(),
            source,
        })?;
        if line.trim().is_empty() {
            continue;
        }
        let mut record: QuestionRecord =
            serde_json::from_str(&line).map_err(|source| Error::MalformedLine {
                line: idx + 1,
                source,
            })?;
        record.id = records.len() as u64 + 1;
        records.push(record);
    }
    match limit {
        Some(requested) if records.len() < requested => Err(Error::TooFewRecords {
            requested,
            available: records.len(),
        }),
        _ => Ok(records),
    }
}

/// Read the record at the 0-based `index`.
pub fn read_question_at(path: impl AsRef<Path>, index: usize) -> Result<QuestionRecord> {
    let requested = index.checked_add(1).ok_or(Error::TooFewRecords {
        requested: usize::MAX,
        available: 0,
    })?;
    read_questions(path, Some(requested))?
        .pop()
        .ok_or(Error::TooFewRecords {
            requested,
            available: 0,
        })
}

/// Read the output of a generation run.
///
/// Accepts arrays written by this crate as well as untagged objects that use
/// `gemini_answer` for the model's label and `error`/`raw` for failures.
pub fn read_reasoning(path: impl AsRef<Path>) -> Result<Vec<Entry<ReasoningResult>>> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| Error::Open {
        path: path.to_owned(),
        source,
    })?;
    let values: Vec<Value> =
        serde_json::from_str(&text).map_err(|source| Error::MalformedResults {
            path: path.to_owned(),
            source,
        })?;
    values
        .into_iter()
        .enumerate()
        .map(|(idx, value)| {
            reasoning_entry(value).map_err(|source| Error::MalformedEntry {
                position: idx + 1,
                source,
            })
        })
        .collect()
}

fn reasoning_entry(value: Value) -> serde_json::Result<Entry<ReasoningResult>> {
    if value.get("status").is_some() {
        return serde_json::from_value(value);
    }
    if value.get("raw").is_some() {
        serde_json::from_value::<FallbackRecord>(value)?
            .pipe(Entry::Fallback)
            .pipe(Ok)
    } else if value.get("error").is_some() {
        serde_json::from_value::<ErrorRecord>(value)?
            .pipe(Entry::Error)
            .pipe(Ok)
    } else {
        serde_json::from_value::<ReasoningResult>(value)?
            .pipe(Entry::Ok)
            .pipe(Ok)
    }
}

#[cfg(test)]
mod test {
    use std::io::Write;

    use super::*;

    const LINE: &str = r#"{"question": "A 23-year-old woman has dysuria. Which is the best treatment?", "answer": "Nitrofurantoin", "options": {"A": "Ampicillin", "B": "Ceftriaxone", "C": "Doxycycline", "D": "Nitrofurantoin"}, "meta_info": "step2&3", "answer_idx": "D"}"#;

    fn jsonl(lines: &[&str]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(file, "{}", line).unwrap();
        }
        file
    }

    #[test]
    fn reads_records_with_positional_ids() {
        let file = jsonl(&[LINE, "", LINE]);
        let records = read_questions(file.path(), None).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, 1);
        assert_eq!(records[1].id, 2);
        assert_eq!(records[0].options.get(AnswerLabel::B), "Ceftriaxone");
        assert_eq!(records[0].ground_truth(), Some(AnswerLabel::D));
    }

    #[test]
    fn truncates_to_limit() {
        let file = jsonl(&[LINE, LINE, LINE]);
        let records = read_questions(file.path(), Some(2)).unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn short_dataset_is_an_error() {
        let file = jsonl(&[LINE]);
        let err = read_questions(file.path(), Some(20)).unwrap_err();
        assert!(matches!(
            err,
            Error::TooFewRecords {
                requested: 20,
                available: 1
            }
        ));
    }

    #[test]
    fn malformed_line_reports_line_number() {
        let file = jsonl(&[LINE, "{not json"]);
        let err = read_questions(file.path(), None).unwrap_err();
        assert!(matches!(err, Error::MalformedLine { line: 2, .. }));
    }

    #[test]
    fn missing_option_key_is_malformed() {
        let file = jsonl(&[r#"{"question": "q", "options": {"A": "a", "B": "b", "C": "c"}}"#]);
        let err = read_questions(file.path(), None).unwrap_err();
        assert!(matches!(err, Error::MalformedLine { line: 1, .. }));
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = read_questions("/nonexistent/questions.jsonl", None).unwrap_err();
        assert!(matches!(err, Error::Open { .. }));
    }

    #[test]
    fn reads_record_at_index() {
        let other = LINE.replace("dysuria", "fever");
        let file = jsonl(&[LINE, &other]);
        let record = read_question_at(file.path(), 1).unwrap();
        assert_eq!(record.id, 2);
        assert!(record.question.contains("fever"));
    }

    #[test]
    fn index_past_usize_is_too_few_records() {
        let file = jsonl(&[LINE]);
        let err = read_question_at(file.path(), usize::MAX).unwrap_err();
        assert!(matches!(err, Error::TooFewRecords { .. }));
    }

    #[test]
    fn ground_truth_from_option_text() {
        let record = QuestionRecord {
            id: 1,
            question: "q".to_string(),
            options: Options {
                a: "Ampicillin".to_string(),
                b: "Ceftriaxone".to_string(),
                c: "Doxycycline".to_string(),
                d: "Nitrofurantoin".to_string(),
            },
            answer: Some("ceftriaxone".to_string()),
            answer_idx: None,
            meta_info: None,
        };
        assert_eq!(record.ground_truth(), Some(AnswerLabel::B));
    }

    #[test]
    fn extracts_labels_from_model_text() {
        assert_eq!(AnswerLabel::extract("B"), Some(AnswerLabel::B));
        assert_eq!(AnswerLabel::extract(" c. "), Some(AnswerLabel::C));
        assert_eq!(AnswerLabel::extract("D) Nitrofurantoin"), Some(AnswerLabel::D));
        assert_eq!(AnswerLabel::extract("Final answer: A"), Some(AnswerLabel::A));
        assert_eq!(AnswerLabel::extract("Option B"), Some(AnswerLabel::B));
        assert_eq!(AnswerLabel::extract("b)"), Some(AnswerLabel::B));
        assert_eq!(AnswerLabel::extract("A/B/C/D"), None);
        assert_eq!(AnswerLabel::extract("E"), None);
        assert_eq!(AnswerLabel::extract(""), None);
        assert_eq!(AnswerLabel::extract("a urinary tract infection"), None);
        assert_eq!(AnswerLabel::extract("Answer is a cystitis"), None);
        assert_eq!(AnswerLabel::extract("A or B"), None);
        assert_eq!(AnswerLabel::extract("C, although D is close"), None);
    }

    #[test]
    fn reads_tagged_and_legacy_reasoning() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let options = serde_json::json!({"A": "a", "B": "b", "C": "c", "D": "d"});
        let array = serde_json::json!([
            {"status": "ok", "id": 1, "question": "q1", "options": options, "model_answer": "A", "justification": {"reasoning_summary": "s"}},
            {"id": 2, "question": "q2", "options": options, "gemini_answer": "b", "justification": {}},
            {"id": 3, "question": "q3", "options": options, "error": "Invalid JSON returned", "raw": "nope"},
            {"id": 4, "error": "quota exceeded"}
        ]);
        write!(file, "{}", array).unwrap();

        let entries = read_reasoning(file.path()).unwrap();
        assert_eq!(entries.len(), 4);
        match &entries[0] {
            Entry::Ok(result) => assert_eq!(result.model_answer, Some(AnswerLabel::A)),
            other => panic!("unexpected entry {:?}", other),
        }
        match &entries[1] {
            Entry::Ok(result) => assert_eq!(result.model_answer, Some(AnswerLabel::B)),
            other => panic!("unexpected entry {:?}", other),
        }
        assert!(matches!(&entries[2], Entry::Fallback(f) if f.raw == "nope"));
        assert!(matches!(&entries[3], Entry::Error(e) if e.id == 4 && e.question.is_none()));
    }

    #[test]
    fn reasoning_file_must_be_an_array() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{\"id\": 1}}").unwrap();
        let err = read_reasoning(file.path()).unwrap_err();
        assert!(matches!(err, Error::MalformedResults { .. }));
    }
}
