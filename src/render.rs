use std::io::Write;
use std::rc::Rc;

use anyhow::Result;
use clap::ValueEnum;

use crate::value::Value;

pub type RenderCallback = Box<dyn Fn(&Value)>;

/// Append-only list of observers that receive finished draw trees.
#[derive(Default)]
pub struct RenderBridge {
    callbacks: Vec<Rc<dyn Fn(&Value)>>,
}

impl RenderBridge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, callback: RenderCallback) {
        self.callbacks.push(Rc::from(callback));
    }

    /// The callbacks registered so far, in registration order. Callers that
    /// hold the bridge behind a `RefCell` invoke this copy after releasing the
    /// borrow, so a callback may register further callbacks.
    pub fn snapshot(&self) -> Vec<Rc<dyn Fn(&Value)>> {
        self.callbacks.clone()
    }

    /// Invoke every callback, in registration order.
    pub fn publish(&self, value: &Value) {
        for cb in &self.callbacks {
            cb(value);
        }
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Text,
}

// Headless stand-in for a drawing backend: the draw tree is written out
// instead of rasterized.
pub fn write_draw_tree<W: Write>(out: &mut W, value: &Value, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, value)?;
            writeln!(out)?;
        }
        OutputFormat::Text => writeln!(out, "{}", value)?,
    }
    Ok(())
}

pub fn headless_sink(format: OutputFormat) -> RenderCallback {
    Box::new(move |value: &Value| {
        let stdout = std::io::stdout();
        let mut lock = stdout.lock();
        if let Err(e) = write_draw_tree(&mut lock, value, format) {
            tracing::warn!("failed to write draw tree: {e}");
        }
    })
}
