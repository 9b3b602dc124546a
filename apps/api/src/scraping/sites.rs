//! Known-site strategy table.
//!
//! Each rule maps one or more domain substrings to an ordered list of steps.
//! Dispatch only ever asks the table for the first rule whose pattern occurs in
//! the host, so new job boards are added with [`SiteTable::register`].

use regex::Regex;

/// Template placeholders understood by [`JobApiStep::endpoint_for`].
const HOST_PLACEHOLDER: &str = "{host}";
const ID_PLACEHOLDER: &str = "{id}";

/// One step of a site rule. Steps run in order; the first that yields enough text wins.
#[derive(Debug, Clone)]
pub enum SiteStep {
    /// CSS selectors tried in order against the page.
    Selectors(Vec<&'static str>),
    /// JSON job API keyed by a job id parsed from the URL path.
    JobApi(JobApiStep),
    /// Last resort: long paragraph and list-item nodes inside content containers.
    ParagraphScan,
}

#[derive(Debug, Clone)]
pub struct JobApiStep {
    /// First capture group is the job id.
    pub job_id: Regex,
    /// Endpoint template using `{host}` and `{id}`.
    pub endpoint: String,
}

impl JobApiStep {
    pub fn new(job_id_pattern: &str, endpoint: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            job_id: Regex::new(job_id_pattern)?,
            endpoint: endpoint.to_string(),
        })
    }

    /// API endpoint for a job page, or `None` when the path carries no job id.
    pub fn endpoint_for(&self, host: &str, path: &str) -> Option<String> {
        let id = self.job_id.captures(path)?.get(1)?.as_str();
        Some(
            self.endpoint
                .replace(HOST_PLACEHOLDER, host)
                .replace(ID_PLACEHOLDER, id),
        )
    }
}

#[derive(Debug, Clone)]
pub struct SiteRule {
    pub name: &'static str,
    pub domains: Vec<&'static str>,
    pub steps: Vec<SiteStep>,
}

impl SiteRule {
    pub fn new(name: &'static str, domains: &[&'static str]) -> Self {
        Self {
            name,
            domains: domains.to_vec(),
            steps: Vec::new(),
        }
    }

    pub fn selectors(mut self, selectors: &[&'static str]) -> Self {
        self.steps.push(SiteStep::Selectors(selectors.to_vec()));
        self
    }

    pub fn job_api(mut self, step: JobApiStep) -> Self {
        self.steps.push(SiteStep::JobApi(step));
        self
    }

    pub fn paragraph_scan(mut self) -> Self {
        self.steps.push(SiteStep::ParagraphScan);
        self
    }

    fn matches(&self, host: &str) -> bool {
        self.domains.iter().any(|d| host.contains(d))
    }
}

#[derive(Debug, Clone, Default)]
pub struct SiteTable {
    rules: Vec<SiteRule>,
}

impl SiteTable {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Appends a rule. Earlier rules win when several patterns match a host.
    pub fn register(&mut self, rule: SiteRule) -> &mut Self {
        self.rules.push(rule);
        self
    }

    pub fn rule_for(&self, host: &str) -> Option<&SiteRule> {
        let host = host.to_lowercase();
        self.rules.iter().find(|rule| rule.matches(&host))
    }

    /// The built-in table: a careers platform plus LinkedIn, Indeed and Glassdoor.
    pub fn known_job_boards() -> Self {
        let mut table = Self::empty();

        let careers = SiteRule::new("careers-platform", &["github.careers", "github.com"])
            .selectors(&[
                r#"div[data-testid="jobDetails"]"#,
                "div.job-details",
                "div.job-description",
                r#"div[class*="description"]"#,
                r#"section[class*="description"]"#,
                "article#description-body",
            ]);
        let careers = match JobApiStep::new(r"/jobs/(\d+)", "https://{host}/api/jobs/{id}") {
            Ok(step) => careers.job_api(step),
            Err(e) => {
                tracing::warn!("Skipping careers job API step: {e}");
                careers
            }
        };

        table
            .register(careers.paragraph_scan())
            .register(
                SiteRule::new("linkedin", &["linkedin.com"])
                    .selectors(&["div.description__text", "div.show-more-less-html"]),
            )
            .register(SiteRule::new("indeed", &["indeed.com"]).selectors(&["div#jobDescriptionText"]))
            .register(
                SiteRule::new("glassdoor", &["glassdoor.com"])
                    .selectors(&["div.jobDescriptionContent"]),
            );

        table
    }
}

/// Coarse selectors tried, in order, for hosts with no registered rule.
pub const GENERIC_SELECTORS: &[&str] = &[
    r#"div[class*="job"][class*="description"]"#,
    r#"div[class*="description"]"#,
    "main",
    "article",
];

/// Containers searched by the paragraph scan, and the nodes collected inside them.
pub const SCAN_CONTAINERS: &str = r#"article, main, div[class*="description"], div[class*="content"], div[class*="job"]"#;
pub const SCAN_NODES: &str = "p, li";
/// Scanned nodes must be strictly longer than this.
pub const SCAN_NODE_MIN_LENGTH: usize = 50;
