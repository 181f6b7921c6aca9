//! Agent configuration

/// Tunables for the agent graph, fixed at construction time.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// System prompt for the outer reasoning node
    pub system_prompt: String,

    /// System prompt for the search sub-workflow's reasoning node
    pub search_prompt: String,

    /// Tool names that require human approval before execution
    pub gated_tools: Vec<String>,

    /// Tool name routed through the self-correcting sub-workflow
    pub delegated_tool: String,

    /// Once this many tool observations exist in a thread, routing goes
    /// straight to end regardless of pending calls
    pub max_tool_results: usize,

    /// Retry ceiling for the search sub-workflow
    pub max_search_retries: u32,

    /// Node-execution cap per turn
    pub max_steps: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            system_prompt: "You are a helpful assistant.".to_string(),
            search_prompt: "You query a records database. If a query fails, read the error \
                            and adjust the field or table names, then try again."
                .to_string(),
            gated_tools: vec!["send_email".to_string()],
            delegated_tool: "search_records".to_string(),
            max_tool_results: 10,
            max_search_retries: 3,
            max_steps: 25,
        }
    }
}

impl AgentConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_search_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.search_prompt = prompt.into();
        self
    }

    pub fn with_gated_tools(mut self, names: Vec<String>) -> Self {
        self.gated_tools = names;
        self
    }

    pub fn with_delegated_tool(mut self, name: impl Into<String>) -> Self {
        self.delegated_tool = name.into();
        self
    }

    pub fn with_max_tool_results(mut self, ceiling: usize) -> Self {
        self.max_tool_results = ceiling;
        self
    }

    pub fn with_max_search_retries(mut self, ceiling: u32) -> Self {
        self.max_search_retries = ceiling;
        self
    }

    pub fn with_max_steps(mut self, max_steps: u64) -> Self {
        self.max_steps = max_steps;
        self
    }
}
