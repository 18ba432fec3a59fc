//! Engine configuration
use super::event::ApprovalChain;
use super::hr::HrCompletion;
use super::role::PermissionTable;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineConfig {
    pub permissions: PermissionTable,
    pub chain: ApprovalChain,
    pub hr_completion: HrCompletion,
    /// counter offers below zero are refused unless this is set
    pub allow_negative_counter_offers: bool,
}

impl EngineConfig {
    /// Standard permission table and review chain
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with_permissions(mut self, permissions: PermissionTable) -> Self {
        self.permissions = permissions;
        self
    }
    pub fn with_chain(mut self, chain: ApprovalChain) -> Self {
        self.chain = chain;
        self
    }
    pub fn with_hr_completion(mut self, completion: HrCompletion) -> Self {
        self.hr_completion = completion;
        self
    }
    pub fn with_negative_counter_offers(mut self, allow: bool) -> Self {
        self.allow_negative_counter_offers = allow;
        self
    }
}
