// Usage cooldown: who called (identity), when they last ran an evaluation
// (store), and whether they may run another one now (gate).

pub mod gate;
pub mod identity;
pub mod store;
