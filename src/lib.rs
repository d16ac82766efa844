mod bus_types;
mod case;
mod contingency;
mod dc;
mod error;
mod jac;
mod loadcase;
mod math;
mod network;
mod newton;
mod order;
mod parameters;
mod pf;
mod ptdf;
mod results;
mod sbus;
mod security;
mod sensitivity;
mod slack;
mod topology;
mod traits;
mod ybus;

pub mod debug;
pub mod factory;

#[cfg(test)]
mod tests;

pub use contingency::*;
pub use error::*;
pub use loadcase::*;
pub use network::{
    Branch, BranchBuilder, BranchKind, Bus, BusBuilder, Connected, ElementType, EnergySource,
    Generator, GeneratorBuilder, Load, LoadBuilder, Network, Switch,
};
pub use parameters::*;
pub use pf::*;
pub use results::*;
pub use security::*;
pub use sensitivity::*;
pub use traits::*;
