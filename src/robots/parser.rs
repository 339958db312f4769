//! Robots.txt parser implementation
//!
//! Only two things are read from robots.txt: `Disallow` rules, which are
//! compared with the crawl root as plain path prefixes in both directions
//! regardless of the user-agent group they appear in, and `Crawl-delay`.

/// Parsed robots.txt data
#[derive(Debug, Clone)]
pub struct ParsedRobots {
    /// Raw robots.txt content (empty string means allow all)
    content: String,
    /// Non-empty `Disallow:` values in file order
    disallowed: Vec<String>,
}

impl ParsedRobots {
    /// Creates a new ParsedRobots from raw robots.txt content
    ///
    /// Lines without a `key: value` shape are skipped.
    pub fn from_content(content: &str) -> Self {
        let disallowed = directives(content)
            .filter(|(key, value)| key == "disallow" && !value.is_empty())
            .map(|(_, value)| value.to_string())
            .collect();

        Self {
            content: content.to_string(),
            disallowed,
        }
    }

    /// Creates a permissive ParsedRobots that allows everything
    ///
    /// This is used as the default when robots.txt cannot be fetched.
    pub fn allow_all() -> Self {
        Self {
            content: String::new(),
            disallowed: Vec::new(),
        }
    }

    /// Checks whether a crawl rooted at `root_path` may proceed
    ///
    /// A rule blocks the crawl when it covers the root (`Disallow: /en` for
    /// `/en/`) and also when it lies inside the crawl tree
    /// (`Disallow: /en/cart` for `/en/`).
    ///
    /// # Returns
    ///
    /// * `false` - if any `Disallow:` value is a prefix of `root_path`, or
    ///   `root_path` is a prefix of it
    /// * `true` - otherwise
    pub fn allows_root(&self, root_path: &str) -> bool {
        match self
            .disallowed
            .iter()
            .find(|rule| root_path.starts_with(rule.as_str()) || rule.starts_with(root_path))
        {
            Some(rule) => {
                tracing::info!("robots.txt rule 'Disallow: {}' overlaps {}", rule, root_path);
                false
            }
            None => true,
        }
    }

    /// Gets the crawl delay for a specific user agent
    ///
    /// A delay declared in a group naming the agent wins over one declared for
    /// `*`.
    ///
    /// # Returns
    ///
    /// * `Some(f64)` - The crawl delay in seconds
    /// * `None` - If no crawl delay is specified
    pub fn crawl_delay(&self, user_agent: &str) -> Option<f64> {
        let mut current_user_agents: Vec<String> = Vec::new();
        let mut crawl_delay_for_wildcard: Option<f64> = None;
        let mut crawl_delay_for_agent: Option<f64> = None;
        let mut group_open = false;

        let normalized_agent = user_agent.to_lowercase();

        for (key, value) in directives(&self.content) {
            match key.as_str() {
                "user-agent" => {
                    // Consecutive User-agent lines share one group
                    if group_open {
                        current_user_agents.clear();
                        group_open = false;
                    }
                    current_user_agents.push(value.to_lowercase());
                }
                "crawl-delay" => {
                    group_open = true;
                    let Ok(delay) = value.parse::<f64>() else {
                        continue;
                    };
                    if current_user_agents.iter().any(|ua| ua == "*") {
                        crawl_delay_for_wildcard = Some(delay);
                    } else if current_user_agents
                        .iter()
                        .any(|ua| !ua.is_empty() && normalized_agent.contains(ua.as_str()))
                    {
                        crawl_delay_for_agent = Some(delay);
                    }
                }
                _ => group_open = true,
            }
        }

        crawl_delay_for_agent.or(crawl_delay_for_wildcard)
    }
}

/// Iterates `(lowercase key, trimmed value)` pairs, skipping blanks, comments
/// and lines without a colon
fn directives(content: &str) -> impl Iterator<Item = (String, &str)> {
    content.lines().filter_map(|line| {
        let line = line.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            return None;
        }
        let (key, value) = line.split_once(':')?;
        Some((key.trim().to_lowercase(), value.trim()))
    })
}
