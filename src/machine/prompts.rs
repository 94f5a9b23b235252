//! Collecting prompt values for machine configs.
//!
//! Input and output are injected so the whole flow runs against in-memory
//! buffers in tests. Every interactive loop is bounded by [`MAX_ATTEMPTS`].
use std::collections::BTreeMap;
use std::fmt;
use std::io::{self, BufRead, Write};

use crate::config::{MachinePrompt, Manifest, PromptField, PromptKind};
use crate::error::TemplateError;

/// Attempts allowed for an empty required value or an invalid choice.
pub const MAX_ATTEMPTS: usize = 3;

/// Options for value collection.
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptOptions {
    /// Use defaults without reading input.
    pub skip_prompts: bool,
}

/// Values collected for one machine config, keyed by field id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptResult {
    /// Machine config id.
    pub id: String,
    /// Field id to value.
    pub values: BTreeMap<String, String>,
}

/// Normalize a yes/no answer to `"true"` or `"false"`.
#[must_use]
pub fn normalize_confirm(answer: &str) -> &'static str {
    match answer.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" | "true" | "1" => "true",
        _ => "false",
    }
}

/// Reads answers from `input` and writes questions to `output`.
pub struct Prompter<'a> {
    input: Box<dyn BufRead + 'a>,
    output: Box<dyn Write + 'a>,
}

impl fmt::Debug for Prompter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Prompter").finish_non_exhaustive()
    }
}

impl Prompter<'static> {
    /// Prompter on the process's stdin and stdout.
    #[must_use]
    pub fn stdio() -> Self {
        Self::new(io::BufReader::new(io::stdin()), io::stdout())
    }
}

impl<'a> Prompter<'a> {
    /// Prompter on arbitrary streams.
    pub fn new(input: impl BufRead + 'a, output: impl Write + 'a) -> Self {
        Self {
            input: Box::new(input),
            output: Box::new(output),
        }
    }

    /// Collect values for every declared machine config, in manifest order.
    ///
    /// # Errors
    ///
    /// Stops at the first field that cannot be resolved.
    pub fn collect_all(
        &mut self,
        manifest: &Manifest,
        opts: PromptOptions,
    ) -> Result<Vec<PromptResult>, TemplateError> {
        manifest
            .machine_config
            .iter()
            .map(|prompt| self.collect(prompt, opts))
            .collect()
    }

    /// Collect values for the machine config `id`.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::NotFound`] for an unknown id, or the error of
    /// the first field that cannot be resolved.
    pub fn collect_single(
        &mut self,
        manifest: &Manifest,
        id: &str,
        opts: PromptOptions,
    ) -> Result<PromptResult, TemplateError> {
        let prompt = manifest
            .machine(id)
            .ok_or_else(|| TemplateError::NotFound(id.to_string()))?;
        self.collect(prompt, opts)
    }

    /// Walk `prompt`'s fields in order and resolve each one.
    ///
    /// # Errors
    ///
    /// Returns the error of the first field that cannot be resolved.
    pub fn collect(
        &mut self,
        prompt: &MachinePrompt,
        opts: PromptOptions,
    ) -> Result<PromptResult, TemplateError> {
        if !opts.skip_prompts && !prompt.prompts.is_empty() {
            let title = if prompt.description.is_empty() {
                &prompt.id
            } else {
                &prompt.description
            };
            writeln!(self.output, "\n{title}")?;
        }
        let mut values = BTreeMap::new();
        for field in &prompt.prompts {
            let value = if opts.skip_prompts {
                default_value(field)?
            } else {
                self.ask(field)?
            };
            values.insert(field.id.clone(), value);
        }
        Ok(PromptResult {
            id: prompt.id.clone(),
            values,
        })
    }

    /// Ask a yes/no question; only `y`/`yes` count as agreement.
    ///
    /// # Errors
    ///
    /// Returns an error when the streams fail.
    pub fn confirm(&mut self, question: &str) -> io::Result<bool> {
        write!(self.output, "{question} [y/N]: ")?;
        self.output.flush()?;
        let answer = self.read_line()?.unwrap_or_default();
        Ok(matches!(
            answer.to_ascii_lowercase().as_str(),
            "y" | "yes"
        ))
    }

    fn ask(&mut self, field: &PromptField) -> Result<String, TemplateError> {
        if field.kind == PromptKind::Select {
            for (idx, option) in field.options.iter().enumerate() {
                writeln!(self.output, "  {}) {option}", idx + 1)?;
            }
        }
        for attempt in 1..=MAX_ATTEMPTS {
            write!(self.output, "{}: ", question(field))?;
            self.output.flush()?;

            let Some(answer) = self.read_line()? else {
                return eof_value(field);
            };

            if field.kind == PromptKind::Confirm {
                return Ok(normalize_confirm(&answer).to_string());
            }

            if answer.is_empty() {
                if !field.default.is_empty() || !field.required {
                    return Ok(field.default.clone());
                }
                writeln!(self.output, "A value is required.")?;
            } else if field.kind == PromptKind::Select {
                if let Some(choice) = pick_option(&field.options, &answer) {
                    return Ok(choice);
                }
                writeln!(self.output, "Please choose one of the listed options.")?;
            } else {
                return Ok(answer);
            }
            tracing::debug!(field = %field.id, attempt, "answer rejected");
        }
        Err(TemplateError::TooManyAttempts {
            field: field.id.clone(),
            attempts: MAX_ATTEMPTS,
        })
    }

    /// One trimmed line, or `None` at end of input.
    fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }
}

fn question(field: &PromptField) -> String {
    let label = if field.label.is_empty() {
        &field.id
    } else {
        &field.label
    };
    match field.kind {
        PromptKind::Confirm => format!("{label} [y/N]"),
        PromptKind::Password => label.to_string(),
        PromptKind::Text | PromptKind::Select if !field.default.is_empty() => {
            format!("{label} [{}]", field.default)
        }
        PromptKind::Text | PromptKind::Select => label.to_string(),
    }
}

fn pick_option(options: &[String], answer: &str) -> Option<String> {
    if let Some(found) = options.iter().find(|o| o.as_str() == answer) {
        return Some(found.clone());
    }
    answer
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|idx| options.get(idx))
        .cloned()
}

/// Value used when prompting is skipped.
fn default_value(field: &PromptField) -> Result<String, TemplateError> {
    if field.kind == PromptKind::Confirm {
        if field.default.is_empty() && field.required {
            return Err(TemplateError::MissingDefault(field.id.clone()));
        }
        return Ok(normalize_confirm(&field.default).to_string());
    }
    if field.default.is_empty() && field.required {
        return Err(TemplateError::MissingDefault(field.id.clone()));
    }
    Ok(field.default.clone())
}

/// Value used when input ends before an answer.
fn eof_value(field: &PromptField) -> Result<String, TemplateError> {
    default_value(field).map_err(|_| TemplateError::NotProvided(field.id.clone()))
}
