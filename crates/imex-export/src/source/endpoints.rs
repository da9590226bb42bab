//! Images API endpoint URL builders

/// List endpoint for a tenant/project window
pub fn images_url(base_url: &str, tenant_id: &str, project_id: &str, offset: u64, limit: u64) -> String {
    format!(
        "{}/tenants/{}/projects/{}/images?offset={}&limit={}",
        base_url.trim_end_matches('/'),
        tenant_id,
        project_id,
        offset,
        limit
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_images_url() {
        assert_eq!(
            images_url("https://api.example.com/v1/", "acme", "p1", 200, 100),
            "https://api.example.com/v1/tenants/acme/projects/p1/images?offset=200&limit=100"
        );
    }
}
