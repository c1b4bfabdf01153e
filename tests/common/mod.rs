//! Shared test fixtures
//!
//! Builders for model containers and pretrained directories used across the
//! integration suites. Containers use the runtime's binary layout (magic,
//! version, tensor table, payload); pretrained directories carry
//! `config.json`, `model.fpmc`, and `tokenizer.json`.

#![allow(dead_code)]

use byteorder::{LittleEndian, WriteBytesExt};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub use serial_test::serial;

/// Tensor description used by the container writer: (name, dims, dtype code)
pub type TensorSpec<'a> = (&'a str, &'a [u64], u32);

/// Write a valid model container with a small default tensor table
pub fn write_model_container(path: &Path) -> anyhow::Result<()> {
    write_model_container_with(
        path,
        &[
            ("tok_embeddings.weight", &[64, 16], 0),
            ("layers.0.attn.weight", &[16, 16], 1),
            ("output.weight", &[16, 64], 2),
        ],
    )
}

/// Write a model container with an explicit tensor table and full payload
pub fn write_model_container_with(path: &Path, tensors: &[TensorSpec]) -> anyhow::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(b"FPMC")?;
    file.write_u32::<LittleEndian>(1)?;
    file.write_u64::<LittleEndian>(tensors.len() as u64)?;

    let mut payload_bytes: u64 = 0;
    for (name, dims, dtype) in tensors {
        file.write_u32::<LittleEndian>(name.len() as u32)?;
        file.write_all(name.as_bytes())?;
        file.write_u32::<LittleEndian>(dims.len() as u32)?;
        for dim in *dims {
            file.write_u64::<LittleEndian>(*dim)?;
        }
        file.write_u32::<LittleEndian>(*dtype)?;

        let element_size = match dtype {
            0 => 4,
            1 => 2,
            _ => 1,
        };
        payload_bytes += dims.iter().product::<u64>() * element_size;
    }

    file.write_all(&vec![0u8; payload_bytes as usize])?;
    Ok(())
}

/// Write a container whose payload is shorter than the table promises
pub fn write_truncated_container(path: &Path) -> anyhow::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(b"FPMC")?;
    file.write_u32::<LittleEndian>(1)?;
    file.write_u64::<LittleEndian>(1)?;
    file.write_u32::<LittleEndian>(1)?;
    file.write_all(b"w")?;
    file.write_u32::<LittleEndian>(2)?;
    file.write_u64::<LittleEndian>(8)?;
    file.write_u64::<LittleEndian>(8)?;
    file.write_u32::<LittleEndian>(0)?;
    // 8*8*4 = 256 payload bytes promised, 4 written.
    file.write_all(&[0u8; 4])?;
    Ok(())
}

/// Write a file that is not a model container at all
pub fn write_bad_magic(path: &Path) -> anyhow::Result<()> {
    std::fs::write(path, b"GGUFnot-actually-our-format")?;
    Ok(())
}

/// Write a container with an unsupported format version
pub fn write_unsupported_version(path: &Path) -> anyhow::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(b"FPMC")?;
    file.write_u32::<LittleEndian>(99)?;
    file.write_u64::<LittleEndian>(0)?;
    Ok(())
}

/// Minimal word-level tokenizer definition covering the default prompt
fn tokenizer_json() -> &'static str {
    r#"{
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
    "vocab": {
      "<unk>": 0,
      "def": 1,
      "fib": 2,
      "(": 3,
      "n": 4,
      ")": 5,
      ":": 6,
      "return": 7,
      "if": 8,
      "else": 9
    },
    "unk_token": "<unk>"
  }
}"#
}

/// Build a complete pretrained directory in a fresh tempdir
///
/// Layout: `config.json` (codegen, vocab 512), `model.fpmc`, `tokenizer.json`.
pub fn create_pretrained_dir() -> anyhow::Result<(TempDir, PathBuf)> {
    let temp = TempDir::new()?;
    let dir = temp.path().to_path_buf();

    std::fs::write(
        dir.join("config.json"),
        r#"{ "model_type": "codegen", "vocab_size": 512 }"#,
    )?;
    write_model_container(&dir.join("model.fpmc"))?;
    std::fs::write(dir.join("tokenizer.json"), tokenizer_json())?;

    Ok((temp, dir))
}

/// Pretrained directory missing its tokenizer definition
pub fn create_pretrained_dir_without_tokenizer() -> anyhow::Result<(TempDir, PathBuf)> {
    let (temp, dir) = create_pretrained_dir()?;
    std::fs::remove_file(dir.join("tokenizer.json"))?;
    Ok((temp, dir))
}

/// Pretrained directory with a custom `config.json` body
pub fn create_pretrained_dir_with_config(config: &str) -> anyhow::Result<(TempDir, PathBuf)> {
    let (temp, dir) = create_pretrained_dir()?;
    std::fs::write(dir.join("config.json"), config)?;
    Ok((temp, dir))
}
