//! Interactive flow for the deploy command.
//!
//! Prompts for any deployment parameter not given on the command line and
//! provides the confirmation gate used during the apply phase.
//! Uses dialoguer for terminal UI prompts.

use std::io::{self, Write};

use anyhow::Result;
use console::style;
use dialoguer::{Confirm, Input, theme::ColorfulTheme};

use kubeship_core::apply::{ApplyGate, Checkpoint};
use kubeship_core::config::{DeployDefaults, RawInputs};

/// Result of interactive flow.
#[derive(Debug, Clone)]
pub struct InteractiveResult {
    /// Inputs with every prompted value filled in
    pub inputs: RawInputs,
    /// Whether user confirmed the deployment
    pub confirmed: bool,
}

/// Interactive flow for collecting deployment parameters.
///
/// Values already present in the pre-filled inputs are never prompted for.
/// With `yes` set, optional parameters silently take their defaults and the
/// final confirmation is skipped.
pub struct InteractiveFlow<W: Write = io::Stdout> {
    defaults: DeployDefaults,
    prefilled: RawInputs,
    /// Namespace of the current kubeconfig context, offered as the default
    active_namespace: Option<String>,
    yes: bool,
    /// Output writer (for testing)
    writer: W,
    theme: ColorfulTheme,
}

impl InteractiveFlow<io::Stdout> {
    pub fn new(
        defaults: DeployDefaults,
        prefilled: RawInputs,
        active_namespace: Option<String>,
        yes: bool,
    ) -> Self {
        Self {
            defaults,
            prefilled,
            active_namespace,
            yes,
            writer: io::stdout(),
            theme: ColorfulTheme::default(),
        }
    }
}

impl<W: Write> InteractiveFlow<W> {
    /// Create a new interactive flow with custom writer (for testing).
    #[cfg(test)]
    pub fn with_writer(
        defaults: DeployDefaults,
        prefilled: RawInputs,
        active_namespace: Option<String>,
        yes: bool,
        writer: W,
    ) -> Self {
        Self {
            defaults,
            prefilled,
            active_namespace,
            yes,
            writer,
            theme: ColorfulTheme::default(),
        }
    }

    /// Run the interactive flow and collect deployment inputs.
    pub fn collect(&mut self) -> Result<InteractiveResult> {
        self.print_header()?;

        let mut inputs = self.prefilled.clone();

        inputs.app_name = Some(self.prompt_required(
            &self.prefilled.app_name,
            "Application name",
            &self.defaults.app_name,
        )?);
        inputs.image = Some(self.prompt_required(
            &self.prefilled.image,
            "Container image",
            &self.defaults.image,
        )?);

        let namespace_default = self
            .active_namespace
            .clone()
            .filter(|ns| !ns.trim().is_empty())
            .unwrap_or_else(|| self.defaults.namespace.clone());
        inputs.namespace =
            Some(self.prompt_optional(&self.prefilled.namespace, "Namespace", &namespace_default)?);
        inputs.port = Some(self.prompt_optional(
            &self.prefilled.port,
            "Container port",
            &self.defaults.port,
        )?);
        inputs.replicas = Some(self.prompt_optional(
            &self.prefilled.replicas,
            "Replicas",
            &self.defaults.replicas,
        )?);
        inputs.cpu_request = Some(self.prompt_optional(
            &self.prefilled.cpu_request,
            "CPU request",
            &self.defaults.cpu_request,
        )?);
        inputs.cpu_limit = Some(self.prompt_optional(
            &self.prefilled.cpu_limit,
            "CPU limit",
            &self.defaults.cpu_limit,
        )?);
        inputs.memory_request = Some(self.prompt_optional(
            &self.prefilled.memory_request,
            "Memory request",
            &self.defaults.memory_request,
        )?);
        inputs.memory_limit = Some(self.prompt_optional(
            &self.prefilled.memory_limit,
            "Memory limit",
            &self.defaults.memory_limit,
        )?);
        if !inputs.skip_output {
            let output_default = self.defaults.output_dir.display().to_string();
            inputs.output_target = Some(self.prompt_optional(
                &self.prefilled.output_target,
                "Manifest output directory",
                &output_default,
            )?);
        }

        let confirmed = self.show_summary_and_confirm(&inputs)?;

        Ok(InteractiveResult { inputs, confirmed })
    }

    fn print_header(&mut self) -> Result<()> {
        writeln!(self.writer)?;
        writeln!(
            self.writer,
            "{}",
            style("  Kubeship Deploy Wizard").bold().cyan()
        )?;
        writeln!(self.writer)?;
        Ok(())
    }

    /// Prompted even with `yes` when there is neither a value nor a default.
    fn prompt_required(
        &self,
        prefilled: &Option<String>,
        prompt: &str,
        default: &str,
    ) -> Result<String> {
        if let Some(value) = non_blank(prefilled) {
            return Ok(value);
        }
        if self.yes && !default.trim().is_empty() {
            return Ok(default.to_string());
        }

        let mut input = Input::<String>::with_theme(&self.theme).with_prompt(prompt);
        if !default.trim().is_empty() {
            input = input.default(default.to_string());
        }
        Ok(input.interact_text()?)
    }

    fn prompt_optional(
        &self,
        prefilled: &Option<String>,
        prompt: &str,
        default: &str,
    ) -> Result<String> {
        if let Some(value) = non_blank(prefilled) {
            return Ok(value);
        }
        if self.yes {
            return Ok(default.to_string());
        }

        let value: String = Input::with_theme(&self.theme)
            .with_prompt(prompt)
            .default(default.to_string())
            .interact_text()?;
        Ok(value)
    }

    fn show_summary_and_confirm(&mut self, inputs: &RawInputs) -> Result<bool> {
        let field = |value: &Option<String>| value.clone().unwrap_or_else(|| "-".to_string());

        writeln!(self.writer)?;
        writeln!(self.writer, "{}", style("  Summary").bold())?;
        writeln!(self.writer, "  ───────────────────────────")?;
        writeln!(
            self.writer,
            "  App:       {}",
            style(field(&inputs.app_name)).green()
        )?;
        writeln!(self.writer, "  Image:     {}", style(field(&inputs.image)).green())?;
        writeln!(
            self.writer,
            "  Namespace: {}",
            style(field(&inputs.namespace)).green()
        )?;
        writeln!(self.writer, "  Port:      {}", style(field(&inputs.port)).green())?;
        writeln!(
            self.writer,
            "  Replicas:  {}",
            style(field(&inputs.replicas)).green()
        )?;
        writeln!(
            self.writer,
            "  CPU:       {} / {}",
            style(field(&inputs.cpu_request)).green(),
            style(field(&inputs.cpu_limit)).green()
        )?;
        writeln!(
            self.writer,
            "  Memory:    {} / {}",
            style(field(&inputs.memory_request)).green(),
            style(field(&inputs.memory_limit)).green()
        )?;
        if inputs.skip_output {
            writeln!(self.writer, "  Output:    {}", style("not written").dim())?;
        } else {
            writeln!(
                self.writer,
                "  Output:    {}",
                style(field(&inputs.output_target)).green()
            )?;
        }
        writeln!(self.writer)?;

        if self.yes {
            return Ok(true);
        }

        let confirmed = Confirm::with_theme(&self.theme)
            .with_prompt("Render manifests with these settings?")
            .default(true)
            .interact()?;

        Ok(confirmed)
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// [`ApplyGate`] that asks on the terminal.
///
/// Always asks before the apply phase and before creating a namespace; asks
/// before each manifest only when `confirm_each` is set. A prompt that cannot
/// be shown (no TTY) counts as "no".
pub struct PromptGate {
    confirm_each: bool,
    theme: ColorfulTheme,
}

impl PromptGate {
    pub fn new(confirm_each: bool) -> Self {
        Self {
            confirm_each,
            theme: ColorfulTheme::default(),
        }
    }

    fn ask(&self, prompt: String, default: bool) -> bool {
        match Confirm::with_theme(&self.theme)
            .with_prompt(prompt)
            .default(default)
            .interact()
        {
            Ok(answer) => answer,
            Err(err) => {
                tracing::warn!(error = %err, "confirmation prompt failed, treating as declined");
                false
            }
        }
    }
}

impl ApplyGate for PromptGate {
    fn confirm(&mut self, checkpoint: &Checkpoint<'_>) -> bool {
        match checkpoint {
            Checkpoint::BeginApply(manifests) => self.ask(
                format!(
                    "Apply {} manifests to namespace '{}'?",
                    manifests.len(),
                    manifests.namespace()
                ),
                true,
            ),
            Checkpoint::CreateNamespace(namespace) => self.ask(
                format!("Namespace '{namespace}' does not exist. Create it?"),
                true,
            ),
            Checkpoint::Apply(manifest) if self.confirm_each => self.ask(
                format!("Apply {} '{}'?", manifest.kind(), manifest.name()),
                true,
            ),
            Checkpoint::Apply(_) => true,
        }
    }
}
