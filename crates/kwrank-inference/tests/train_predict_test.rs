//! Train a model, persist it, and score candidates through a predictor that
//! loads the artifact from disk.

use std::sync::Arc;

use kwrank_inference::{
    load_examples, FeatureExtractor, LocalNlpBackend, Prediction, RelevanceGate, RelevanceModel,
    RelevancePredictor, Trainer, TrainingConfig,
};

const DATASET: &str = r#"{"text":"como fazer email marketing para iniciantes","theme":"email marketing","origin":"autocomplete","relevant":true}
{"text":"email marketing passo a passo","theme":"email marketing","origin":"autocomplete","relevant":true}
{"text":"dicas de email marketing gratuito","theme":"email marketing","origin":"reddit","relevant":true}
{"text":"o que e email marketing","theme":"email marketing","origin":"reddit","relevant":true}
{"text":"exemplos de email marketing com resultados","theme":"email marketing","origin":"autocomplete","relevant":true}
{"text":"vantagens do email marketing","theme":"email marketing","origin":"quora","relevant":true}
{"text":"bolo","theme":"email marketing","origin":"quora","relevant":false}
{"text":"xyz","theme":"email marketing","origin":"reddit","relevant":false}
{"text":"login","theme":"email marketing","origin":"autocomplete","relevant":false}
{"text":"gmail","theme":"email marketing","origin":"reddit","relevant":false}
{"text":"tempo","theme":"email marketing","origin":"quora","relevant":false}
{"text":"a","theme":"email marketing","origin":"autocomplete","relevant":false}
"#;

#[test]
fn test_train_save_load_predict() {
    let dir = tempfile::tempdir().unwrap();
    let data_path = dir.path().join("labeled.jsonl");
    let model_path = dir.path().join("models").join("relevance_model.json");
    std::fs::write(&data_path, DATASET).unwrap();

    let examples = load_examples(&data_path).unwrap();
    assert_eq!(examples.len(), 12);

    let extractor = FeatureExtractor::new(Arc::new(LocalNlpBackend::new()));
    let (model, report) = Trainer::new(&extractor)
        .with_config(TrainingConfig {
            test_fraction: 0.25,
            ..TrainingConfig::default()
        })
        .train(&examples)
        .unwrap();
    assert_eq!(report.n_test, 3);
    assert_eq!(
        model.origin_vocabulary,
        vec!["autocomplete", "quora", "reddit"]
    );

    model.save(&model_path).unwrap();
    let reloaded = RelevanceModel::load(&model_path).unwrap();
    assert_eq!(reloaded.feature_names, model.feature_names);

    let gate: Box<dyn RelevanceGate> = Box::new(RelevancePredictor::new(extractor, &model_path));
    let long = gate.predict(
        "como fazer email marketing com resultados",
        "email marketing",
        "autocomplete",
        &[],
        0.5,
    );
    let short = gate.predict("bolo", "email marketing", "quora", &[], 0.5);

    assert!(matches!(long, Prediction::Scored { .. }));
    assert!(matches!(short, Prediction::Scored { .. }));
    assert!(long.probability() > short.probability());
}

#[test]
fn test_unknown_origin_still_scores() {
    let dir = tempfile::tempdir().unwrap();
    let data_path = dir.path().join("labeled.jsonl");
    std::fs::write(&data_path, DATASET).unwrap();

    let extractor = FeatureExtractor::new(Arc::new(LocalNlpBackend::new()));
    let (model, _) = Trainer::new(&extractor)
        .train(&load_examples(&data_path).unwrap())
        .unwrap();

    let predictor = RelevancePredictor::with_classifier(extractor, Arc::new(model));
    let prediction = predictor.predict("email marketing", "email marketing", "tiktok", &[], 0.5);
    assert!(matches!(prediction, Prediction::Scored { .. }));
}
