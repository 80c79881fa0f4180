use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PaginationParams {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PaginationInfo {
    pub total: i64,
    pub limit: u32,
    pub offset: u32,
    pub has_more: bool,
}

impl PaginationParams {
    pub fn get_limit(&self) -> u32 {
        self.limit.unwrap_or(20).clamp(1, 100)
    }

    pub fn get_offset(&self) -> u32 {
        self.offset.unwrap_or(0)
    }
}

impl PaginationInfo {
    pub fn new(total: i64, params: &PaginationParams) -> Self {
        let limit = params.get_limit();
        let offset = params.get_offset();
        Self {
            total,
            limit,
            offset,
            has_more: total > (offset + limit) as i64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_defaults() {
        let params = PaginationParams {
            limit: None,
            offset: None,
        };
        assert_eq!(params.get_limit(), 20);
        assert_eq!(params.get_offset(), 0);
    }

    #[test]
    fn test_pagination_clamps_limit() {
        let params = PaginationParams {
            limit: Some(500),
            offset: Some(10),
        };
        assert_eq!(params.get_limit(), 100);
        assert_eq!(params.get_offset(), 10);
    }

    #[test]
    fn test_pagination_info_has_more() {
        let params = PaginationParams {
            limit: Some(20),
            offset: Some(0),
        };
        assert!(PaginationInfo::new(25, &params).has_more);
        assert!(!PaginationInfo::new(20, &params).has_more);
    }
}
