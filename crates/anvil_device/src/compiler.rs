//! Shader Compilation
//!
//! The device consumes bytecode blobs tagged with the stage they were
//! compiled for. [`ShaderCompiler`] is the seam between source text and
//! those blobs; any toolchain can sit behind it. [`ReferenceCompiler`]
//! performs the structural checks a real front end would reject first
//! (empty source, unbalanced delimiters, missing entry point) and emits a
//! blob for the profile's stage.

use std::hash::{Hash, Hasher};

use anvil_core::ShaderStage;
use rustc_hash::FxHasher;

const MAGIC: &[u8; 4] = b"ANVL";

/// Result of one compiler invocation.
#[derive(Debug, Clone, Default)]
pub struct CompileOutput {
    /// Present when compilation produced code.
    pub bytecode: Option<Vec<u8>>,
    /// Errors and warnings, one per line.
    pub diagnostics: String,
}

impl CompileOutput {
    /// Whether any diagnostic line is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics.contains("error")
    }
}

pub trait ShaderCompiler: Send + Sync {
    fn compile(&self, source: &str, source_name: &str, entry_point: &str, profile: &str) -> CompileOutput;
}

/// Builds a bytecode blob.
#[must_use]
pub fn encode_blob(stage: ShaderStage, entry_point: &str, source: &str) -> Vec<u8> {
    let mut hasher = FxHasher::default();
    source.hash(&mut hasher);

    let entry = entry_point.as_bytes();
    let mut blob = Vec::with_capacity(MAGIC.len() + 3 + entry.len() + 8);
    blob.extend_from_slice(MAGIC);
    blob.push(stage.index() as u8);
    blob.extend_from_slice(&(entry.len() as u16).to_le_bytes());
    blob.extend_from_slice(entry);
    blob.extend_from_slice(&hasher.finish().to_le_bytes());
    blob
}

/// Stage a blob was compiled for, or `None` if it is not a valid blob.
#[must_use]
pub fn blob_stage(bytecode: &[u8]) -> Option<ShaderStage> {
    if bytecode.len() < MAGIC.len() + 3 || &bytecode[..4] != MAGIC {
        return None;
    }
    ShaderStage::ALL.get(bytecode[4] as usize).copied()
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceCompiler;

fn is_ident(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn defines_function(source: &str, name: &str) -> bool {
    source.match_indices(name).any(|(at, _)| {
        let before_ok = source[..at].chars().next_back().is_none_or(|c| !is_ident(c));
        let rest = &source[at + name.len()..];
        before_ok && rest.trim_start().starts_with('(')
    })
}

fn unbalanced(source: &str) -> Option<(usize, char)> {
    let mut stack = Vec::new();
    for (line, text) in source.lines().enumerate() {
        for c in text.chars() {
            match c {
                '{' | '(' | '[' => stack.push((line + 1, c)),
                '}' | ')' | ']' => {
                    let expected = match c {
                        '}' => '{',
                        ')' => '(',
                        _ => '[',
                    };
                    match stack.pop() {
                        Some((_, open)) if open == expected => {}
                        _ => return Some((line + 1, c)),
                    }
                }
                _ => {}
            }
        }
    }
    stack.pop()
}

impl ShaderCompiler for ReferenceCompiler {
    fn compile(&self, source: &str, source_name: &str, entry_point: &str, profile: &str) -> CompileOutput {
        let fail = |diagnostics: String| CompileOutput {
            bytecode: None,
            diagnostics,
        };

        let Some(stage) = ShaderStage::from_profile(profile) else {
            return fail(format!("{source_name}: error: unknown target profile '{profile}'"));
        };
        if source.trim().is_empty() {
            return fail(format!("{source_name}(1): error: unexpected end of file"));
        }
        if let Some((line, c)) = unbalanced(source) {
            return fail(format!("{source_name}({line}): error: unbalanced '{c}'"));
        }
        if !defines_function(source, entry_point) {
            return fail(format!("{source_name}: error: entry point '{entry_point}' not found"));
        }

        CompileOutput {
            bytecode: Some(encode_blob(stage, entry_point, source)),
            diagnostics: String::new(),
        }
    }
}
