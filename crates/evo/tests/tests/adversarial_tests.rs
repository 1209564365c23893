#[path = "adversarial/hostile_diffs.rs"]
mod hostile_diffs;

#[path = "adversarial/hostile_provider.rs"]
mod hostile_provider;
