use std::io::{self, Write};

use serde::Serialize;

use crate::app::{Action, ReconcileResult};

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Json,
    Text,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_reconcile(result: &ReconcileResult) -> io::Result<()> {
        Self::print_json(result)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

pub struct TextOutput;

impl TextOutput {
    pub fn print_reconcile(result: &ReconcileResult) -> io::Result<()> {
        let mut stdout = io::stdout().lock();
        Self::write_summary(&mut stdout, result)
    }

    pub fn write_summary<W: Write>(out: &mut W, result: &ReconcileResult) -> io::Result<()> {
        let green = "\x1b[32m";
        let yellow = "\x1b[33m";
        let cyan = "\x1b[36m";
        let reset = "\x1b[0m";

        writeln!(
            out,
            "{cyan}library {} ({}){reset}",
            result.library.name,
            action_label(result.library.action)
        )?;
        writeln!(
            out,
            "{green}uploaded: {}{reset}  {yellow}skipped: {}{reset}  planned: {}",
            result.count(Action::Uploaded),
            result.count(Action::Skipped),
            result.count(Action::Planned)
        )?;

        for item in &result.items {
            let color = match item.action {
                Action::Uploaded => green,
                Action::Skipped => yellow,
                _ => cyan,
            };
            writeln!(
                out,
                "{color}  {}/{} ({}){reset}",
                item.folder,
                item.name,
                action_label(item.action)
            )?;
        }
        Ok(())
    }
}

fn action_label(action: Action) -> &'static str {
    match action {
        Action::Found => "found",
        Action::Created => "created",
        Action::Skipped => "already present",
        Action::Uploaded => "uploaded",
        Action::Planned => "dry run",
    }
}
