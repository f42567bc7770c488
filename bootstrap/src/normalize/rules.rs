//! Rewrite rules for the application entry script.
//!
//! A rule is plain data: a name, a regular expression and the literal text
//! that replaces its first match. All rules go through [`apply_rule`].

use log::debug;
use regex::{NoExpand, Regex};
use std::borrow::Cow;

/// A single find-and-replace rule.
#[derive(Debug, Clone)]
pub struct RewriteRule {
    name: &'static str,
    pattern: Regex,
    replacement: &'static str,
}

impl RewriteRule {
    /// Compile a rule.
    ///
    /// # Errors
    ///
    /// Returns an error if `pattern` is not a valid regular expression.
    pub fn new(name: &'static str, pattern: &str, replacement: &'static str) -> Result<Self, regex::Error> {
        Ok(Self {
            name,
            pattern: Regex::new(pattern)?,
            replacement,
        })
    }

    /// The rule name used in diagnostics.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// The literal replacement text.
    #[must_use]
    pub const fn replacement(&self) -> &'static str {
        self.replacement
    }
}

/// Replace the first match of `rule` in `text`.
///
/// The replacement is inserted literally; `$` is not expanded. When the
/// pattern does not match, `text` is returned unchanged and borrowed.
///
/// # Examples
///
/// ```
/// use std::borrow::Cow;
/// use trellis_bootstrap::normalize::rules::{RewriteRule, apply_rule};
///
/// let rule = RewriteRule::new("greeting", "hello", "$bye").unwrap();
/// assert_eq!(apply_rule("hello hello", &rule), "$bye hello");
/// assert!(matches!(apply_rule("nothing", &rule), Cow::Borrowed(_)));
/// ```
#[must_use]
pub fn apply_rule<'t>(text: &'t str, rule: &RewriteRule) -> Cow<'t, str> {
    let rewritten = rule.pattern.replacen(text, 1, NoExpand(rule.replacement));
    if matches!(rewritten, Cow::Borrowed(_)) {
        debug!("rule {} did not match", rule.name);
    }
    rewritten
}

/// Pattern for the import preamble, spanning lines.
pub const IMPORT_PREAMBLE_PATTERN: &str = r"(?s)import gradio as gr.*?from typing import \*";

/// Pattern for the examples gallery call.
pub const EXAMPLES_GALLERY_PATTERN: &str = r"examples = gr\.Examples\([\s\S]*?\)\s*\)";

const IMPORT_PREAMBLE: &str = "import os
import sys
import gradio as gr
import torch
import numpy as np
from typing import *

# Add the current directory to the Python path
CURRENT_DIR = os.path.dirname(os.path.abspath(__file__))
sys.path.append(CURRENT_DIR)

";

const EXAMPLES_GALLERY: &str = "examples = gr.Examples(
        examples=[
            os.path.join(CURRENT_DIR, 'assets', 'example_image', image)
            for image in os.listdir(os.path.join(CURRENT_DIR, 'assets', 'example_image'))
        ],
        inputs=image_prompt,
    )";

/// The rules applied to the entry script, in order.
///
/// # Errors
///
/// Returns an error only if a built-in pattern fails to compile.
pub fn default_rules() -> Result<Vec<RewriteRule>, regex::Error> {
    Ok(vec![
        RewriteRule::new("import-preamble", IMPORT_PREAMBLE_PATTERN, IMPORT_PREAMBLE)?,
        RewriteRule::new("examples-gallery", EXAMPLES_GALLERY_PATTERN, EXAMPLES_GALLERY)?,
    ])
}
