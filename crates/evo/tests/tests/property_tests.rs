#[path = "property/apply_decision.rs"]
mod apply_decision;

#[path = "property/gate_completeness.rs"]
mod gate_completeness;

#[path = "property/ledger_redaction.rs"]
mod ledger_redaction;
