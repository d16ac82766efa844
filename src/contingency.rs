use crate::error::{Error, Result};
use crate::network::{ElementRef, Network};

/// A named set of element outages.
#[derive(Debug, Clone, PartialEq)]
pub struct Contingency {
    pub id: String,
    pub label: Option<String>,
    pub elements: Vec<String>,
}

/// Element of a contingency resolved against a network.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Outage {
    Branch(usize),
    Generator(usize),
    Load(usize),
    Switch(usize),
}

impl Contingency {
    pub fn new(id: impl Into<String>, elements: Vec<String>) -> Self {
        Self {
            id: id.into(),
            label: None,
            elements,
        }
    }

    /// Contingency removing a single element, named after it.
    pub fn single_element(element_id: &str, label: Option<&str>) -> Self {
        Self {
            id: element_id.to_string(),
            label: label.map(str::to_string),
            elements: vec![element_id.to_string()],
        }
    }

    /// Checks that every element exists and can be taken out of service.
    pub(crate) fn resolve(&self, network: &Network) -> Result<Vec<Outage>> {
        if self.elements.is_empty() {
            return Err(Error::InvalidContingency(format!(
                "contingency '{}' has no element",
                self.id
            )));
        }
        self.elements
            .iter()
            .map(|id| match network.lookup(id) {
                Some(ElementRef::Branch(i)) => Ok(Outage::Branch(i)),
                Some(ElementRef::Generator(i)) => Ok(Outage::Generator(i)),
                Some(ElementRef::Load(i)) => Ok(Outage::Load(i)),
                Some(ElementRef::Switch(i)) => Ok(Outage::Switch(i)),
                Some(ElementRef::Bus(_)) => Err(Error::InvalidContingency(format!(
                    "bus '{}' cannot be tripped",
                    id
                ))),
                None => Err(Error::not_found("Element", id)),
            })
            .collect()
    }

    /// Returns a copy of `network` with the contingency applied.
    ///
    /// Branches are disconnected at both ends, injections are disconnected
    /// and switches are opened.
    pub fn apply_to(&self, network: &Network) -> Result<Network> {
        let outages = self.resolve(network)?;
        let mut working = network.clone();
        for (outage, id) in outages.iter().zip(&self.elements) {
            match outage {
                Outage::Switch(_) => {
                    working.open_switch(id)?;
                }
                _ => {
                    working.disconnect(id);
                }
            }
        }
        Ok(working)
    }
}

/// Registered contingencies with unique identifiers.
#[derive(Debug, Clone, Default)]
pub(crate) struct ContingencyList {
    contingencies: Vec<Contingency>,
}

impl ContingencyList {
    pub(crate) fn add(&mut self, contingency: Contingency) -> Result<()> {
        if self.contingencies.iter().any(|c| c.id == contingency.id) {
            return Err(Error::DuplicateId(contingency.id));
        }
        self.contingencies.push(contingency);
        Ok(())
    }

    pub(crate) fn as_slice(&self) -> &[Contingency] {
        &self.contingencies
    }

    /// Resolves every contingency, failing on the first unknown element.
    pub(crate) fn resolve(&self, network: &Network) -> Result<Vec<Vec<Outage>>> {
        self.contingencies
            .iter()
            .map(|c| c.resolve(network))
            .collect()
    }
}
