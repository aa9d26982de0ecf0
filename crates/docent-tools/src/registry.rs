#[derive(Debug, Clone)]
pub struct ToolDef {
    pub id: &'static str,
    pub description: &'static str,
    pub schema: schemars::Schema,
}

impl ToolDef {
    /// The parameter schema as plain JSON, ready for a provider request.
    #[must_use]
    pub fn parameters(&self) -> serde_json::Value {
        self.schema.as_value().clone()
    }
}

#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: Vec<ToolDef>,
}

impl ToolRegistry {
    #[must_use]
    pub fn from_definitions(tools: Vec<ToolDef>) -> Self {
        Self { tools }
    }

    #[must_use]
    pub fn tools(&self) -> &[ToolDef] {
        &self.tools
    }

    #[must_use]
    pub fn find(&self, id: &str) -> Option<&ToolDef> {
        self.tools.iter().find(|t| t.id == id)
    }

    /// Tool names in declaration order, as recorded in interaction logs.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.id.to_owned()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(serde::Deserialize, schemars::JsonSchema)]
    #[allow(dead_code)]
    struct Params {
        /// What to look for
        query: String,
    }

    fn registry() -> ToolRegistry {
        ToolRegistry::from_definitions(vec![ToolDef {
            id: "search",
            description: "Search the docs",
            schema: schemars::schema_for!(Params),
        }])
    }

    #[test]
    fn find_by_id() {
        let r = registry();
        assert!(r.find("search").is_some());
        assert!(r.find("bash").is_none());
    }

    #[test]
    fn names_in_order() {
        assert_eq!(registry().names(), vec!["search".to_owned()]);
    }

    #[test]
    fn parameters_are_object_schema() {
        let r = registry();
        let params = r.tools()[0].parameters();
        assert_eq!(params["type"], "object");
        assert!(params["properties"]["query"].is_object());
        assert_eq!(params["required"][0], "query");
    }
}
