use std::env;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ServiceContext {
    pub(crate) service_name: String,
    pub(crate) environment: String,
    pub(crate) component: String,
}

impl ServiceContext {
    pub(crate) fn from_env(component: &str) -> Self {
        Self::from_values(
            component,
            env::var("SERVICE_NAME").ok(),
            env::var("STAGE").ok(),
        )
    }

    fn from_values(
        component: &str,
        service_name: Option<String>,
        environment: Option<String>,
    ) -> Self {
        let component = component.trim().to_string();
        let non_empty = |value: Option<String>| value.filter(|v| !v.trim().is_empty());

        Self {
            service_name: non_empty(service_name).unwrap_or_else(|| component.clone()),
            environment: non_empty(environment).unwrap_or_else(|| "unknown".to_string()),
            component,
        }
    }
}
