//! The model capability and the optional score fields it emits.

use crate::{batch::Batch, common::*, error::EvalError};
use tch::{CModule, IValue};

/// The score fields a model may emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScoreKind {
    #[serde(rename = "s")]
    S,
    #[serde(rename = "s_AE")]
    SAe,
    #[serde(rename = "s_rev")]
    SRev,
}

impl ScoreKind {
    pub const ALL: [ScoreKind; 3] = [Self::S, Self::SAe, Self::SRev];

    /// The field name in the model output.
    pub fn output_name(&self) -> &'static str {
        match self {
            Self::S => "s",
            Self::SAe => "s_AE",
            Self::SRev => "s_rev",
        }
    }

    /// The field name in the result artifact.
    pub fn artifact_name(&self) -> &'static str {
        match self {
            Self::S => "scores",
            Self::SAe => "scores_AE",
            Self::SRev => "scores_rev",
        }
    }

    pub fn from_output_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.output_name() == name)
    }
}

/// Presence flags of score fields, fixed for a whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct OutputFields {
    pub s: bool,
    pub s_ae: bool,
    pub s_rev: bool,
}

impl OutputFields {
    pub fn all() -> Self {
        Self {
            s: true,
            s_ae: true,
            s_rev: true,
        }
    }

    pub fn contains(&self, kind: ScoreKind) -> bool {
        match kind {
            ScoreKind::S => self.s,
            ScoreKind::SAe => self.s_ae,
            ScoreKind::SRev => self.s_rev,
        }
    }

    pub fn kinds(self) -> impl Iterator<Item = ScoreKind> {
        ScoreKind::ALL
            .into_iter()
            .filter(move |&kind| self.contains(kind))
    }

    /// Checks a model output carries exactly the declared fields.
    pub fn check<T>(&self, output: &ScoreSet<T>) -> Result<(), EvalError> {
        ScoreKind::ALL.into_iter().try_for_each(|kind| {
            match (self.contains(kind), output.get(kind).is_some()) {
                (true, false) => Err(EvalError::MissingOutput {
                    field: kind.output_name(),
                }),
                (false, true) => Err(EvalError::UnexpectedOutput {
                    field: kind.output_name(),
                }),
                _ => Ok(()),
            }
        })
    }
}

impl FromIterator<ScoreKind> for OutputFields {
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = ScoreKind>,
    {
        iter.into_iter()
            .fold(Self::default(), |mut fields, kind| {
                match kind {
                    ScoreKind::S => fields.s = true,
                    ScoreKind::SAe => fields.s_ae = true,
                    ScoreKind::SRev => fields.s_rev = true,
                }
                fields
            })
    }
}

impl fmt::Display for OutputFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = self.kinds().map(|kind| kind.output_name()).join(", ");
        write!(f, "[{}]", names)
    }
}

/// One optional slot per score field.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreSet<T> {
    pub s: Option<T>,
    pub s_ae: Option<T>,
    pub s_rev: Option<T>,
}

impl<T> Default for ScoreSet<T> {
    fn default() -> Self {
        Self {
            s: None,
            s_ae: None,
            s_rev: None,
        }
    }
}

impl<T> ScoreSet<T> {
    pub fn get(&self, kind: ScoreKind) -> Option<&T> {
        match kind {
            ScoreKind::S => self.s.as_ref(),
            ScoreKind::SAe => self.s_ae.as_ref(),
            ScoreKind::SRev => self.s_rev.as_ref(),
        }
    }

    pub fn insert(&mut self, kind: ScoreKind, value: T) -> Option<T> {
        let slot = match kind {
            ScoreKind::S => &mut self.s,
            ScoreKind::SAe => &mut self.s_ae,
            ScoreKind::SRev => &mut self.s_rev,
        };
        slot.replace(value)
    }

    pub fn fields(&self) -> OutputFields {
        self.iter().map(|(kind, _)| kind).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ScoreKind, &T)> {
        ScoreKind::ALL
            .into_iter()
            .filter_map(move |kind| Some((kind, self.get(kind)?)))
    }

    pub fn as_ref(&self) -> ScoreSet<&T> {
        ScoreSet {
            s: self.s.as_ref(),
            s_ae: self.s_ae.as_ref(),
            s_rev: self.s_rev.as_ref(),
        }
    }

    pub fn map<U, F>(self, mut f: F) -> ScoreSet<U>
    where
        F: FnMut(ScoreKind, T) -> U,
    {
        let Self { s, s_ae, s_rev } = self;
        ScoreSet {
            s: s.map(|value| f(ScoreKind::S, value)),
            s_ae: s_ae.map(|value| f(ScoreKind::SAe, value)),
            s_rev: s_rev.map(|value| f(ScoreKind::SRev, value)),
        }
    }

    pub fn try_map<U, E, F>(self, mut f: F) -> Result<ScoreSet<U>, E>
    where
        F: FnMut(ScoreKind, T) -> Result<U, E>,
    {
        let Self { s, s_ae, s_rev } = self;
        Ok(ScoreSet {
            s: s.map(|value| f(ScoreKind::S, value)).transpose()?,
            s_ae: s_ae.map(|value| f(ScoreKind::SAe, value)).transpose()?,
            s_rev: s_rev.map(|value| f(ScoreKind::SRev, value)).transpose()?,
        })
    }
}

/// Raw `[n, C_compact]` scores emitted by a model.
pub type ModelOutput = ScoreSet<Tensor>;

/// A trained interaction model treated as a black box.
pub trait HoiModel {
    /// The score fields this model variant emits on every batch.
    fn output_fields(&self) -> OutputFields;

    fn forward(&mut self, batch: &Batch) -> Result<ModelOutput>;
}

/// The network variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelKind {
    #[serde(rename = "AE")]
    Ae,
    #[serde(rename = "IDN")]
    Idn,
}

impl ModelKind {
    pub fn default_outputs(&self) -> OutputFields {
        match self {
            Self::Ae => [ScoreKind::S].into_iter().collect(),
            Self::Idn => OutputFields::all(),
        }
    }
}

/// A TorchScript export of the network.
///
/// The module takes a `Dict[str, Tensor]` of batch fields and returns a
/// `Dict[str, Tensor]` in which `s`, `s_AE` and `s_rev` are recognized.
pub struct TorchScriptModel {
    module: CModule,
    outputs: OutputFields,
}

impl TorchScriptModel {
    pub fn load<P>(path: P, device: Device, outputs: OutputFields) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let mut module = CModule::load_on_device(path, device)
            .with_context(|| format!("failed to load model file '{}'", path.display()))?;
        module.set_eval();

        Ok(Self { module, outputs })
    }
}

impl HoiModel for TorchScriptModel {
    fn output_fields(&self) -> OutputFields {
        self.outputs
    }

    fn forward(&mut self, batch: &Batch) -> Result<ModelOutput> {
        let input = IValue::GenericDict(
            batch
                .tensors()
                .into_iter()
                .map(|(name, tensor)| {
                    (
                        IValue::String(name.to_string()),
                        IValue::Tensor(tensor.shallow_clone()),
                    )
                })
                .collect(),
        );
        let output = tch::no_grad(|| self.module.forward_is(&[input]))?;

        let entries = match output {
            IValue::GenericDict(entries) => entries,
            _ => bail!("the model must return a dict of tensors"),
        };

        let mut scores = ModelOutput::default();
        for (key, value) in entries {
            let name = match key {
                IValue::String(name) => name,
                _ => bail!("the model output dict must be keyed by strings"),
            };
            let kind = match ScoreKind::from_output_name(&name) {
                Some(kind) => kind,
                None => {
                    debug!("ignore model output '{}'", name);
                    continue;
                }
            };
            let tensor = match value {
                IValue::Tensor(tensor) => tensor,
                _ => bail!("the model output '{}' is not a tensor", name),
            };
            scores.insert(kind, tensor);
        }

        Ok(scores)
    }
}
