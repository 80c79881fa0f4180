use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// 巡检结果统计
#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct ReminderSweepReport {
    /// 查询命中的已批准申请数
    pub total_found: usize,
    /// 超过闲置阈值、实际进入处理的用户数
    pub processed: usize,
    /// 至少一个渠道送达成功的用户数
    pub successful: usize,
}
