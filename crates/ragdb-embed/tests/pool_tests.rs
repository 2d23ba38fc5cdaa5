use std::str::FromStr;

use candle_core::{Device, Tensor, DType};
use ragdb_embed::{masked_mean_l2, tokenize_batch};
use tokenizers::Tokenizer;

#[test]
fn masked_mean_l2_basic() {
    let dev = Device::Cpu;
    // Two tokens with hidden dim 4; second token is masked out.
    let h = Tensor::from_slice(&[1.0f32, 2.0, 3.0, 4.0,
                                 5.0, 6.0, 7.0, 8.0],
                               (1, 2, 4), &dev).unwrap();
    let mask = Tensor::from_slice(&[1u32, 0u32], (1, 2), &dev).unwrap();
    let out = masked_mean_l2(&h, &mask).unwrap();
    let v: Vec<Vec<f32>> = out.to_vec2().unwrap();
    let norm: f32 = (1.0f32 + 4.0 + 9.0 + 16.0).sqrt();
    let expected = [1.0 / norm, 2.0 / norm, 3.0 / norm, 4.0 / norm];
    for (a, b) in v[0].iter().cloned().zip(expected) {
        assert!((a - b).abs() < 1e-5, "a={} b={}", a, b);
    }
}

#[test]
fn padding_rows_do_not_leak_between_batch_items() {
    let dev = Device::Cpu;
    let h = Tensor::from_slice(&[1.0f32, 0.0, 3.0, 4.0,
                                 0.0, 2.0, 9.0, 9.0],
                               (2, 2, 2), &dev).unwrap();
    let mask = Tensor::from_slice(&[1u32, 1, 1, 0], (2, 2), &dev).unwrap()
        .to_dtype(DType::F32).unwrap();
    let v: Vec<Vec<f32>> = masked_mean_l2(&h, &mask).unwrap().to_vec2().unwrap();
    // row 0: mean([1,0],[3,4]) = [2,2]; row 1: only [0,2]
    let r = 1.0f32 / 2.0f32.sqrt();
    assert!((v[0][0] - r).abs() < 1e-5 && (v[0][1] - r).abs() < 1e-5);
    assert!(v[1][0].abs() < 1e-6 && (v[1][1] - 1.0).abs() < 1e-5);
}

fn word_tokenizer() -> Tokenizer {
    let json = r#"{
        "version": "1.0",
        "truncation": null,
        "padding": null,
        "added_tokens": [],
        "normalizer": null,
        "pre_tokenizer": { "type": "Whitespace" },
        "post_processor": null,
        "decoder": null,
        "model": {
            "type": "WordLevel",
            "vocab": { "[PAD]": 0, "[UNK]": 1, "a": 2, "b": 3, "c": 4, "d": 5, "e": 6 },
            "unk_token": "[UNK]"
        }
    }"#;
    Tokenizer::from_str(json).expect("tokenizer json")
}

#[test]
fn tokenize_pads_and_truncates_to_fixed_length() {
    let tok = word_tokenizer();
    let texts = vec!["a b".to_string(), "a b c d e".to_string()];
    let batch = tokenize_batch(&tok, &texts, 4, 0, &Device::Cpu).unwrap();
    assert_eq!(batch.input_ids.dims(), &[2, 4]);
    let ids: Vec<Vec<u32>> = batch.input_ids.to_vec2().unwrap();
    let mask: Vec<Vec<u32>> = batch.attention_mask.to_vec2().unwrap();
    assert_eq!(ids[0], vec![2, 3, 0, 0]);
    assert_eq!(mask[0], vec![1, 1, 0, 0]);
    // truncation keeps the final token
    assert_eq!(ids[1], vec![2, 3, 4, 6]);
    assert_eq!(mask[1], vec![1, 1, 1, 1]);
    let types: Vec<Vec<u32>> = batch.token_type_ids.to_vec2().unwrap();
    assert!(types.iter().flatten().all(|&t| t == 0));
}

#[test]
fn tokenized_row_does_not_depend_on_batch() {
    let tok = word_tokenizer();
    let alone = tokenize_batch(&tok, &["a c".to_string()], 6, 0, &Device::Cpu).unwrap();
    let mixed = tokenize_batch(&tok, &["b b b b".to_string(), "a c".to_string()], 6, 0, &Device::Cpu).unwrap();
    let alone: Vec<Vec<u32>> = alone.input_ids.to_vec2().unwrap();
    let mixed: Vec<Vec<u32>> = mixed.input_ids.to_vec2().unwrap();
    assert_eq!(alone[0], mixed[1]);
}
