use serde::Serialize;
use serde_json::json;

use crate::common::{Hex, address::Address, message::CallKind, word::Word};
use crate::evm::ExitStatus;

#[derive(Clone, Debug)]
pub enum EventData {
    /// One executed opcode; stack and memory size are taken before execution.
    Opcode {
        pc: usize,
        op: u8,
        name: String,
        gas: u64,
        gas_cost: u64,
        stack: Vec<Word>,
        memory_size: usize,
        refund: i64,
        error: Option<String>,
    },
    Enter {
        kind: CallKind,
        from: Address,
        to: Address,
        gas: u64,
        value: Word,
        input: Vec<u8>,
    },
    Exit {
        status: ExitStatus,
        gas_left: u64,
    },
    Summary {
        output: Vec<u8>,
        gas_used: u64,
        error: Option<String>,
    },
}

#[derive(Clone, Debug)]
pub struct Event {
    pub data: EventData,
    pub depth: usize,
}

#[allow(unused_variables)] // default impl ignores all arguments
pub trait EventTracer: Default {
    /// Opcode events are costly to build; skip them when this is false.
    fn is_enabled(&self) -> bool {
        false
    }
    fn get(&self) -> Vec<Event> {
        vec![]
    }
    fn add(&mut self, event: Event) {}
}

#[derive(Default)]
pub struct NoopTracer;

impl EventTracer for NoopTracer {}

/// Forwards frame boundaries to `tracing` at TRACE level.
#[derive(Default)]
pub struct LoggingTracer;

impl EventTracer for LoggingTracer {
    fn add(&mut self, event: Event) {
        match event.data {
            EventData::Enter {
                kind, from, to, gas, ..
            } => {
                tracing::trace!(depth = event.depth, %kind, %from, %to, gas, "enter");
            }
            EventData::Exit { status, gas_left } => {
                tracing::trace!(depth = event.depth, ?status, gas_left, "exit");
            }
            EventData::Summary { gas_used, .. } => {
                tracing::trace!(gas_used, "done");
            }
            EventData::Opcode { .. } => (),
        }
    }
}

/// Collects everything; renders EIP-3155 style JSON lines.
#[derive(Default)]
pub struct JsonTracer {
    events: Vec<Event>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Step<'a> {
    pc: usize,
    op: u8,
    gas: String,
    gas_cost: String,
    mem_size: usize,
    stack: Vec<String>,
    depth: usize,
    refund: i64,
    op_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
}

impl JsonTracer {
    pub fn lines(&self) -> Vec<String> {
        self.events
            .iter()
            .filter_map(|event| match &event.data {
                EventData::Opcode {
                    pc,
                    op,
                    name,
                    gas,
                    gas_cost,
                    stack,
                    memory_size,
                    refund,
                    error,
                } => {
                    let step = Step {
                        pc: *pc,
                        op: *op,
                        gas: format!("{gas:#x}"),
                        gas_cost: format!("{gas_cost:#x}"),
                        mem_size: *memory_size,
                        stack: stack.iter().map(|w| format!("{w:#x}")).collect(),
                        depth: event.depth,
                        refund: *refund,
                        op_name: name,
                        error: error.as_deref(),
                    };
                    serde_json::to_string(&step).ok()
                }
                EventData::Summary {
                    output,
                    gas_used,
                    error,
                } => {
                    let mut summary = json!({
                        "output": Hex::from(output.clone()).to_string(),
                        "gasUsed": format!("{gas_used:#x}"),
                    });
                    if let Some(error) = error {
                        summary["error"] = json!(error);
                    }
                    Some(summary.to_string())
                }
                _ => None,
            })
            .collect()
    }
}

impl EventTracer for JsonTracer {
    fn is_enabled(&self) -> bool {
        true
    }
    fn get(&self) -> Vec<Event> {
        self.events.clone()
    }
    fn add(&mut self, event: Event) {
        self.events.push(event);
    }
}
