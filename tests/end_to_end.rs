mod support;

use std::time::Duration;

use medqa_snomed::dataset::{read_questions, read_reasoning};
use medqa_snomed::output::ResultWriter;
use medqa_snomed::{
    build_client, Driver, GenerationStage, ModelConfig, Provider, TransportError, ValidationStage,
};
use support::{read_array, write_dataset, StubModel, QUESTION};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const REASONING: &str = r#"```json
{
  "answer": "D",
  "justification": {
    "reasoning_summary": "Acute cystitis in pregnancy; nitrofurantoin is safe in the second trimester.",
    "option_analysis": [],
    "relationships": ["Acute cystitis is-a Cystitis"],
    "concepts": [
      {"name": "Acute cystitis", "snomed_id": "68226007", "link": "https://browser.ihtsdotools.org/?perspective=full&conceptId1=68226007"}
    ]
  }
}
```"#;

const VERDICT: &str = r#"{
  "validator_answer": "D",
  "is_consistent_with_reasoning": true,
  "enhanced_snomed_reasoning": {"summary": "Confirmed.", "concepts": []}
}"#;

#[tokio::test]
async fn single_record_generation_writes_one_result() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_dataset(dir.path(), 1);
    let output = dir.path().join("mcqs_gemini.json");
    let model = StubModel::new(|_| Ok(REASONING.to_owned()));

    let records = read_questions(&input, Some(1)).unwrap();
    Driver::new(&model, ResultWriter::new(&output), Duration::ZERO)
        .run(&GenerationStage, &records)
        .await
        .unwrap();

    let written = read_array(&output);
    assert_eq!(written.len(), 1);
    let entry = &written[0];
    assert_eq!(entry["status"], "ok");
    assert_eq!(entry["id"], 1);
    assert_eq!(entry["question"], QUESTION);
    assert_eq!(entry["options"]["D"], "Nitrofurantoin");
    assert_eq!(entry["model_answer"], "D");
    assert_eq!(entry["justification"]["concepts"][0]["snomed_id"], "68226007");

    let prompts = model.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains(QUESTION));
    for option in ["Ampicillin", "Ceftriaxone", "Doxycycline", "Nitrofurantoin"] {
        assert!(prompts[0].contains(option));
    }
}

#[tokio::test]
async fn generation_then_validation() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_dataset(dir.path(), 4);
    let generated = dir.path().join("mcqs_gemini.json");
    let validated = dir.path().join("mcqs_validated.json");

    let generator = StubModel::new(|prompt| {
        if prompt.contains("Return ONLY valid JSON") {
            Ok(REASONING.to_owned())
        } else {
            Err(TransportError::EmptyResponse)
        }
    });
    let records = read_questions(&input, Some(2)).unwrap();
    Driver::new(&generator, ResultWriter::new(&generated), Duration::ZERO)
        .run(&GenerationStage, &records)
        .await
        .unwrap();

    let prior = read_reasoning(&generated).unwrap();
    assert_eq!(prior.len(), 2);

    let validator = StubModel::new(|_| Ok(VERDICT.to_owned()));
    Driver::new(&validator, ResultWriter::new(&validated), Duration::ZERO)
        .run(&ValidationStage, &prior)
        .await
        .unwrap();

    let written = read_array(&validated);
    assert_eq!(written.len(), 2);
    for (idx, entry) in written.iter().enumerate() {
        assert_eq!(entry["status"], "ok");
        assert_eq!(entry["id"], idx as u64 + 1);
        assert_eq!(entry["model_answer"], "D");
        assert_eq!(entry["validator_answer"], "D");
        assert_eq!(entry["is_consistent_with_reasoning"], true);
    }
    let prompts = validator.prompts();
    assert!(prompts[0].contains("Acute cystitis is-a Cystitis"));
    assert!(prompts[0].contains("Prior answer: D"));
}

#[tokio::test]
async fn gemini_client_drives_a_batch() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.5-pro:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": REASONING}]},
                "finishReason": "STOP"
            }]
        })))
        .expect(3)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let input = write_dataset(dir.path(), 3);
    let output = dir.path().join("out.json");
    let client = build_client(ModelConfig::new(Provider::Gemini, "test-key").with_base_url(server.uri()))
        .unwrap();

    let records = read_questions(&input, Some(3)).unwrap();
    let entries = Driver::new(client.as_ref(), ResultWriter::new(&output), Duration::from_millis(5))
        .run(&GenerationStage, &records)
        .await
        .unwrap();

    assert_eq!(entries.len(), 3);
    assert!(entries.iter().all(|entry| entry.status() == "ok"));
    assert_eq!(read_array(&output).len(), 3);
}
