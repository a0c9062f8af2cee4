use std::collections::BTreeMap;
use std::time::Instant;

use gamepad_loader::{operation::OperationEvent, profiles::ProjectProfile};

use crate::output::{Event, OutputOptions, Reporter};

#[derive(serde::Serialize)]
pub struct JsonEvent {
    schema: u32,
    event: &'static str,
    #[serde(flatten)]
    fields: BTreeMap<&'static str, serde_json::Value>,
}

impl JsonEvent {
    pub fn status(event: &'static str) -> Self {
        Self {
            schema: 1,
            event,
            fields: BTreeMap::new(),
        }
    }

    pub fn with_u64(mut self, k: &'static str, v: u64) -> Self {
        self.fields.insert(k, serde_json::Value::from(v));
        self
    }

    pub fn with_i64(mut self, k: &'static str, v: i64) -> Self {
        self.fields.insert(k, serde_json::Value::from(v));
        self
    }

    pub fn with_str(mut self, k: &'static str, v: &str) -> Self {
        self.fields.insert(k, serde_json::Value::from(v));
        self
    }

    pub fn with_value(mut self, k: &'static str, v: serde_json::Value) -> Self {
        self.fields.insert(k, v);
        self
    }
}

pub struct JsonOutput {
    opts: OutputOptions,
    start: Instant,
}

impl JsonOutput {
    pub fn new(opts: OutputOptions) -> Self {
        Self {
            opts,
            start: Instant::now(),
        }
    }

    fn json_event(&mut self, ev: JsonEvent) {
        let mut ev = ev;
        if self.opts.verbose {
            ev.fields.insert(
                "t_ms",
                serde_json::Value::from(self.start.elapsed().as_millis() as u64),
            );
        }
        println!(
            "{}",
            serde_json::to_string(&ev).unwrap_or_else(|_| "{}".to_string())
        );
    }
}

pub fn operation_event_to_json(ev: OperationEvent) -> JsonEvent {
    match ev {
        OperationEvent::BuildStart { project, mcu } => JsonEvent::status("build_start")
            .with_str("project", &project)
            .with_str("mcu", &mcu),
        OperationEvent::BuildDone { code } => {
            JsonEvent::status("build_done").with_i64("code", code as i64)
        }
        OperationEvent::WaitStart { marker } => {
            JsonEvent::status("wait_start").with_str("marker", &marker)
        }
        OperationEvent::EnumerationFailed { error } => {
            JsonEvent::status("enumeration_failed").with_str("error", &error)
        }
        OperationEvent::WaitPoll { polls } => {
            JsonEvent::status("wait_poll").with_u64("polls", polls as u64)
        }
        OperationEvent::BootloaderDetected { polls } => {
            JsonEvent::status("bootloader_detected").with_u64("polls", polls as u64)
        }
        OperationEvent::ConvertStart { source, dest } => JsonEvent::status("convert")
            .with_str("source", &source.display().to_string())
            .with_str("dest", &dest.display().to_string()),
        OperationEvent::EraseStart => JsonEvent::status("erase_start"),
        OperationEvent::EraseAlreadyBlank { code } => {
            JsonEvent::status("erase_already_blank").with_i64("code", code as i64)
        }
        OperationEvent::EraseDone => JsonEvent::status("erase_done"),
        OperationEvent::FlashStart { image } => {
            JsonEvent::status("flash_start").with_str("image", &image.display().to_string())
        }
        OperationEvent::ProgrammerOutput { text } => {
            JsonEvent::status("programmer_output").with_str("text", &text)
        }
        OperationEvent::Done { replug } => {
            JsonEvent::status("done").with_u64("replug", if replug { 1 } else { 0 })
        }
    }
}

pub fn descriptor_to_json(text: &str, bytes: &[u8]) -> JsonEvent {
    JsonEvent::status("descriptor")
        .with_str("text", text)
        .with_u64("length", bytes.len() as u64)
        .with_value(
            "bytes",
            serde_json::Value::Array(
                bytes.iter().map(|b| serde_json::Value::from(*b)).collect(),
            ),
        )
}

pub fn projects_to_json(profiles: &[ProjectProfile]) -> JsonEvent {
    JsonEvent::status("projects")
        .with_u64("count", profiles.len() as u64)
        .with_value(
            "projects",
            serde_json::Value::Array(
                profiles
                    .iter()
                    .map(|p| {
                        serde_json::to_value(p).unwrap_or_else(|_| {
                            serde_json::Value::Object(serde_json::Map::new())
                        })
                    })
                    .collect(),
            ),
        )
}

impl Reporter for JsonOutput {
    fn emit(&mut self, event: Event) {
        match event {
            Event::Operation(ev) => {
                if matches!(ev, OperationEvent::WaitPoll { .. }) && !self.opts.verbose {
                    // A poll per second forever is too chatty for default
                    // JSON consumers.
                    return;
                }
                self.json_event(operation_event_to_json(ev));
            }
            Event::Descriptor { text, bytes } => {
                self.json_event(descriptor_to_json(&text, &bytes));
            }
            Event::Projects(profiles) => self.json_event(projects_to_json(&profiles)),
            Event::Error {
                code,
                message,
                detail,
            } => {
                let mut ev = JsonEvent::status("error")
                    .with_i64("code", code as i64)
                    .with_str("message", &message);
                if let Some(d) = detail {
                    ev = ev.with_str("detail", &d);
                }
                self.json_event(ev);

                if self.opts.verbose {
                    eprintln!("error: {message}");
                }
            }
        }
    }

    fn finish(&mut self) {}
}
