use std::io::Write;
use std::sync::Mutex;

use async_trait::async_trait;
use medqa_snomed::model::{ModelClient, Result};

pub struct StubModel {
    // maps each prompt to the model's reply
    pub handler: Box<dyn Fn(&str) -> Result<String> + Send + Sync>,
    pub prompts: Mutex<Vec<String>>,
}

impl StubModel {
    pub fn new(handler: impl Fn(&str) -> Result<String> + Send + Sync + 'static) -> Self {
        Self {
            handler: Box::new(handler),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelClient for StubModel {
    async fn send(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_owned());
        (self.handler)(prompt)
    }
}

pub const QUESTION: &str = "A 23-year-old pregnant woman at 22 weeks gestation presents with burning upon urination. She states it started 1 day ago and has been worsening despite drinking more water and taking cranberry extract. Which of the following is the best treatment for this patient?";

pub fn dataset_line() -> String {
    serde_json::json!({
        "question": QUESTION,
        "answer": "Nitrofurantoin",
        "options": {
            "A": "Ampicillin",
            "B": "Ceftriaxone",
            "C": "Doxycycline",
            "D": "Nitrofurantoin"
        },
        "meta_info": "step2&3",
        "answer_idx": "D"
    })
    .to_string()
}

pub fn write_dataset(dir: &std::path::Path, lines: usize) -> std::path::PathBuf {
    let path = dir.join("questions.jsonl");
    let mut file = std::fs::File::create(&path).unwrap();
    for _ in 0..lines {
        writeln!(file, "{}", dataset_line()).unwrap();
    }
    path
}

pub fn read_array(path: &std::path::Path) -> Vec<serde_json::Value> {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}
