// Aggregates all former standalone integration tests as modules.
mod config_driven;
mod draft_round_trip;
mod end_to_end;
mod support;
