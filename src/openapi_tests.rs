#[cfg(test)]
mod tests {
    use crate::schemas::ApiDoc;
    use utoipa::openapi::{PathItemType, RefOr, Schema};
    use utoipa::OpenApi;

    fn object_properties(name: &str) -> Vec<String> {
        let openapi = ApiDoc::openapi();
        let components = openapi.components.expect("components are generated");
        match components.schemas.get(name) {
            Some(RefOr::T(Schema::Object(obj))) => obj.properties.keys().cloned().collect(),
            _ => panic!("{name} should be an object schema"),
        }
    }

    #[test]
    fn test_openapi_schema_generation() {
        let openapi = ApiDoc::openapi();

        let components = openapi.components.as_ref().unwrap();
        for schema in [
            "ErrorResponse",
            "HealthResponse",
            "TeamResponse",
            "PlayerResponse",
            "UserResponse",
            "NewsResponse",
            "Role",
        ] {
            assert!(components.schemas.contains_key(schema), "missing schema {schema}");
        }

        assert!(serde_json::to_string(&openapi).is_ok());
    }

    #[test]
    fn test_error_response_schema_structure() {
        let properties = object_properties("ErrorResponse");

        for field in ["success", "message", "code", "errors"] {
            assert!(properties.iter().any(|p| p == field), "ErrorResponse lacks {field}");
        }
    }

    #[test]
    fn test_health_response_schema_structure() {
        let properties = object_properties("HealthResponse");

        for field in ["status", "version", "database", "storage"] {
            assert!(properties.iter().any(|p| p == field), "HealthResponse lacks {field}");
        }
    }

    #[test]
    fn test_player_response_uses_camel_case() {
        let properties = object_properties("PlayerResponse");

        assert!(properties.iter().any(|p| p == "playerId"));
        assert!(properties.iter().any(|p| p == "photoUrl"));
        assert!(!properties.iter().any(|p| p == "team_id"));
    }

    #[test]
    fn test_openapi_paths_cover_every_resource() {
        let openapi = ApiDoc::openapi();
        let paths = &openapi.paths.paths;

        for (path, method) in [
            ("/health", PathItemType::Get),
            ("/api/v1/auth/login", PathItemType::Post),
            ("/api/v1/auth/register", PathItemType::Post),
            ("/api/v1/teams", PathItemType::Post),
            ("/api/v1/teams/{team_id}", PathItemType::Delete),
            ("/api/v1/players/{player_id}/assign-team", PathItemType::Patch),
            ("/api/v1/users/{id}/role", PathItemType::Patch),
            ("/api/v1/news/my", PathItemType::Get),
            ("/api/v1/news/user/{user_id}", PathItemType::Get),
        ] {
            let item = paths.get(path).unwrap_or_else(|| panic!("missing path {path}"));
            assert!(
                item.operations.contains_key(&method),
                "{path} lacks an expected operation"
            );
        }

        let health = &paths["/health"].operations[&PathItemType::Get];
        assert!(health.responses.responses.contains_key("200"));
        assert!(health.responses.responses.contains_key("500"));
    }

    #[test]
    fn test_bearer_security_scheme_is_registered() {
        let openapi = ApiDoc::openapi();
        let components = openapi.components.as_ref().unwrap();

        assert!(components.security_schemes.contains_key("bearer"));

        let create_team = &openapi.paths.paths["/api/v1/teams"].operations[&PathItemType::Post];
        assert!(create_team.security.is_some());
    }

    #[test]
    fn test_all_error_responses_reference_correct_schema() {
        let openapi_json = serde_json::to_string(&ApiDoc::openapi()).unwrap();

        assert!(!openapi_json.contains("crate.schemas.ErrorResponse"));
        assert!(!openapi_json.contains("crate::schemas::ErrorResponse"));
        assert!(openapi_json.contains("#/components/schemas/ErrorResponse"));
    }
}
