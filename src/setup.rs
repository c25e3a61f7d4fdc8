use crate::cycle::CycleFeatures;
use crate::geometry::RoiSet;
use crate::inspect::{BlobOutputs, Inspector, JudgmentCriteria};
use crate::params::ParameterStore;

/// Everything a cycle needs besides the frame: ROIs, parameters, the enabled
/// features and the blob reporting and judgment settings.
#[derive(Debug, Clone, Default)]
pub struct InspectionSetup {
    pub rois: RoiSet,
    pub params: ParameterStore,
    pub features: CycleFeatures,
    pub blob_outputs: BlobOutputs,
    pub judgment: JudgmentCriteria,
}

impl InspectionSetup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inspector(&self) -> Inspector<'_> {
        Inspector::new(&self.params, &self.judgment)
    }
}
