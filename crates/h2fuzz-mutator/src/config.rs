//! Mutation profile: which fields may be bit-mutated per frame kind and how
//! the operators are weighted.

use std::path::Path;

use h2fuzz_frame::FrameKind;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// A mutable part of a frame. What it refers to depends on the
/// [`FieldGroup`] it is paired with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameField {
    Length,
    Type,
    Flags,
    Reserved,
    StreamId,
    Padding,
    PadFlag,
    Data,
    Exclusive,
    Weight,
    PriorityFlag,
    Name,
    Value,
    Encoding,
    ErrCode,
    Id,
    Increment,
    Dup,
    Delete,
    Swap,
    Split,
}

/// The part of a frame a [`FrameField`] is looked up in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldGroup {
    Base,
    #[serde(rename = "depweight")]
    DepWeight,
    Header,
    Pad,
    Data,
    Headers,
    RstStream,
    Settings,
    PushProm,
    Ping,
    #[serde(rename = "goaway")]
    GoAway,
    WinUpdate,
}

/// A `(field, group)` pair, serialized as a two-element array such as
/// `["length", "pad"]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldRep(pub FrameField, pub FieldGroup);

impl FieldRep {
    pub fn field(self) -> FrameField {
        self.0
    }

    pub fn group(self) -> FieldGroup {
        self.1
    }

    /// Whether frames of `kind` carry this field.
    pub fn applies_to(self, kind: FrameKind) -> bool {
        use FieldGroup as G;
        use FrameField as F;
        use FrameKind as K;

        match self.1 {
            G::Base => matches!(
                self.0,
                F::Length | F::Type | F::Flags | F::Reserved | F::StreamId
            ),
            G::Pad => {
                matches!(kind, K::Data | K::Headers | K::PushPromise)
                    && matches!(self.0, F::Length | F::Padding | F::PadFlag)
            }
            G::DepWeight => {
                matches!(kind, K::Headers | K::Priority)
                    && matches!(self.0, F::Exclusive | F::StreamId | F::Weight)
            }
            G::Headers => kind == K::Headers && self.0 == F::PriorityFlag,
            G::Header => {
                kind.carries_headers()
                    && matches!(
                        self.0,
                        F::Name | F::Value | F::Encoding | F::Dup | F::Delete | F::Swap | F::Split
                    )
            }
            G::Data => kind == K::Data && self.0 == F::Data,
            G::RstStream => kind == K::RstStream && self.0 == F::ErrCode,
            G::Settings => {
                kind == K::Settings
                    && matches!(
                        self.0,
                        F::Id | F::Value | F::Dup | F::Delete | F::Swap | F::Split
                    )
            }
            G::PushProm => kind == K::PushPromise && matches!(self.0, F::Reserved | F::StreamId),
            G::Ping => kind == K::Ping && self.0 == F::Data,
            G::GoAway => {
                kind == K::GoAway
                    && matches!(self.0, F::Reserved | F::StreamId | F::ErrCode | F::Data)
            }
            G::WinUpdate => kind == K::WindowUpdate && matches!(self.0, F::Reserved | F::Increment),
        }
    }

    /// Raw length and type bytes break framing, so the default profile
    /// leaves them out.
    fn in_default_profile(self) -> bool {
        !(self.1 == FieldGroup::Base && matches!(self.0, FrameField::Length | FrameField::Type))
    }
}

/// Every `(field, group)` pair the engine knows, in profile order.
pub const ALL_FIELDS: &[FieldRep] = &[
    FieldRep(FrameField::Length, FieldGroup::Base),
    FieldRep(FrameField::Type, FieldGroup::Base),
    FieldRep(FrameField::Flags, FieldGroup::Base),
    FieldRep(FrameField::Reserved, FieldGroup::Base),
    FieldRep(FrameField::StreamId, FieldGroup::Base),
    FieldRep(FrameField::Length, FieldGroup::Pad),
    FieldRep(FrameField::Padding, FieldGroup::Pad),
    FieldRep(FrameField::PadFlag, FieldGroup::Pad),
    FieldRep(FrameField::Exclusive, FieldGroup::DepWeight),
    FieldRep(FrameField::StreamId, FieldGroup::DepWeight),
    FieldRep(FrameField::Weight, FieldGroup::DepWeight),
    FieldRep(FrameField::PriorityFlag, FieldGroup::Headers),
    FieldRep(FrameField::Name, FieldGroup::Header),
    FieldRep(FrameField::Value, FieldGroup::Header),
    FieldRep(FrameField::Encoding, FieldGroup::Header),
    FieldRep(FrameField::Dup, FieldGroup::Header),
    FieldRep(FrameField::Delete, FieldGroup::Header),
    FieldRep(FrameField::Swap, FieldGroup::Header),
    FieldRep(FrameField::Split, FieldGroup::Header),
    FieldRep(FrameField::Data, FieldGroup::Data),
    FieldRep(FrameField::ErrCode, FieldGroup::RstStream),
    FieldRep(FrameField::Id, FieldGroup::Settings),
    FieldRep(FrameField::Value, FieldGroup::Settings),
    FieldRep(FrameField::Dup, FieldGroup::Settings),
    FieldRep(FrameField::Delete, FieldGroup::Settings),
    FieldRep(FrameField::Swap, FieldGroup::Settings),
    FieldRep(FrameField::Split, FieldGroup::Settings),
    FieldRep(FrameField::Reserved, FieldGroup::PushProm),
    FieldRep(FrameField::StreamId, FieldGroup::PushProm),
    FieldRep(FrameField::Data, FieldGroup::Ping),
    FieldRep(FrameField::Reserved, FieldGroup::GoAway),
    FieldRep(FrameField::StreamId, FieldGroup::GoAway),
    FieldRep(FrameField::ErrCode, FieldGroup::GoAway),
    FieldRep(FrameField::Data, FieldGroup::GoAway),
    FieldRep(FrameField::Reserved, FieldGroup::WinUpdate),
    FieldRep(FrameField::Increment, FieldGroup::WinUpdate),
];

/// Fields eligible for bit mutation, per frame kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MutableFields {
    pub data: Vec<FieldRep>,
    pub headers: Vec<FieldRep>,
    pub priority: Vec<FieldRep>,
    pub rst_stream: Vec<FieldRep>,
    pub settings: Vec<FieldRep>,
    pub push_prom: Vec<FieldRep>,
    pub ping: Vec<FieldRep>,
    pub goaway: Vec<FieldRep>,
    pub win_update: Vec<FieldRep>,
    pub continuation: Vec<FieldRep>,
}

impl MutableFields {
    /// A profile listing nothing; operators that need a field skip.
    pub fn empty() -> Self {
        Self {
            data: Vec::new(),
            headers: Vec::new(),
            priority: Vec::new(),
            rst_stream: Vec::new(),
            settings: Vec::new(),
            push_prom: Vec::new(),
            ping: Vec::new(),
            goaway: Vec::new(),
            win_update: Vec::new(),
            continuation: Vec::new(),
        }
    }

    pub fn for_kind(&self, kind: FrameKind) -> &[FieldRep] {
        match kind {
            FrameKind::Data => &self.data,
            FrameKind::Headers => &self.headers,
            FrameKind::Priority => &self.priority,
            FrameKind::RstStream => &self.rst_stream,
            FrameKind::Settings => &self.settings,
            FrameKind::PushPromise => &self.push_prom,
            FrameKind::Ping => &self.ping,
            FrameKind::GoAway => &self.goaway,
            FrameKind::WindowUpdate => &self.win_update,
            FrameKind::Continuation => &self.continuation,
        }
    }

    pub fn for_kind_mut(&mut self, kind: FrameKind) -> &mut Vec<FieldRep> {
        match kind {
            FrameKind::Data => &mut self.data,
            FrameKind::Headers => &mut self.headers,
            FrameKind::Priority => &mut self.priority,
            FrameKind::RstStream => &mut self.rst_stream,
            FrameKind::Settings => &mut self.settings,
            FrameKind::PushPromise => &mut self.push_prom,
            FrameKind::Ping => &mut self.ping,
            FrameKind::GoAway => &mut self.goaway,
            FrameKind::WindowUpdate => &mut self.win_update,
            FrameKind::Continuation => &mut self.continuation,
        }
    }
}

impl Default for MutableFields {
    fn default() -> Self {
        let mut fields = Self::empty();
        for kind in FrameKind::ALL {
            *fields.for_kind_mut(kind) = ALL_FIELDS
                .iter()
                .copied()
                .filter(|rep| rep.in_default_profile() && rep.applies_to(kind))
                .collect();
        }
        fields
    }
}

/// Weights of the frame-level operators, in percent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutateOperators {
    pub bit: u32,
    pub delete: u32,
    pub dup: u32,
    pub swap: u32,
    pub fix: u32,
}

impl Default for MutateOperators {
    fn default() -> Self {
        Self {
            bit: 20,
            delete: 20,
            dup: 20,
            swap: 20,
            fix: 20,
        }
    }
}

/// Weights of the crossover operators, in percent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossoverOperators {
    pub add: u32,
    pub splice: u32,
}

impl Default for CrossoverOperators {
    fn default() -> Self {
        Self { add: 50, splice: 50 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Likelihoods {
    pub mutate_operators: MutateOperators,
    pub crossover_operators: CrossoverOperators,
    /// Chance, in percent, that crossover of two SETTINGS frames or two
    /// header-bearing frames works on their entries instead of whole frames.
    pub mutate_hdr_settings: u32,
}

impl Default for Likelihoods {
    fn default() -> Self {
        Self {
            mutate_operators: MutateOperators::default(),
            crossover_operators: CrossoverOperators::default(),
            mutate_hdr_settings: 50,
        }
    }
}

/// Configuration of a [`Mutator`](crate::Mutator).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MutationConfig {
    pub mutable_fields: MutableFields,
    pub likelihoods: Likelihoods,
}

impl MutationConfig {
    /// Parse and validate a JSON profile. Missing sections keep their
    /// defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let ops = &self.likelihoods.mutate_operators;
        let sum = ops.bit + ops.delete + ops.dup + ops.swap + ops.fix;
        if sum != 100 {
            return Err(ConfigError::LikelihoodSum {
                group: "mutate_operators",
                sum,
            });
        }

        let cross = &self.likelihoods.crossover_operators;
        let sum = cross.add + cross.splice;
        if sum != 100 {
            return Err(ConfigError::LikelihoodSum {
                group: "crossover_operators",
                sum,
            });
        }

        if self.likelihoods.mutate_hdr_settings > 100 {
            return Err(ConfigError::ProbabilityRange {
                name: "mutate_hdr_settings",
                value: self.likelihoods.mutate_hdr_settings,
            });
        }

        for kind in FrameKind::ALL {
            if let Some(rep) = self
                .mutable_fields
                .for_kind(kind)
                .iter()
                .find(|rep| !rep.applies_to(kind))
            {
                return Err(ConfigError::FieldNotApplicable {
                    frame: kind,
                    field: rep.0,
                    group: rep.1,
                });
            }
        }
        Ok(())
    }

    pub fn to_json_pretty(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
