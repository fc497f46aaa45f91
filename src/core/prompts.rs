//! Prompt text sent to the analysis service.

use crate::core::dashboard_metadata::DashboardAnalysis;
use crate::core::summary::DataSummary;

pub const EXTRACTION_MAX_TOKENS: u32 = 8000;
pub const DOCUMENTATION_MAX_TOKENS: u32 = 16000;
pub const UNIFIED_MAX_TOKENS: u32 = 4000;
pub const DATA_ANALYSIS_MAX_TOKENS: u32 = 4000;
pub const DASHBOARD_METADATA_MAX_TOKENS: u32 = 4000;

const EXTRACTION_PROMPT: &str = r#"You are a dashboard intelligence agent. Examine every dashboard image provided and extract structured information about it.

Extract:
1. Metrics and data: exact numbers, percentages, KPIs, time periods, freshness indicators.
2. Interactive elements: filters and their options, dropdowns, buttons, drill-down controls, date pickers, export and refresh controls.
3. Visual structure: chart types, layout sections, colour coding, hierarchy.
4. Business context: purpose, audience, business value, thresholds.
5. Data quality and insights: completeness, trends, anomalies, actionable items.

Report only what is visible. Output ONLY a JSON object shaped like:
{
  "dashboard_purpose": "...",
  "target_audience": "...",
  "business_value": "...",
  "data_freshness": "...",
  "update_frequency": "...",
  "sections": [
    {
      "section_name": "...",
      "section_type": "...",
      "business_purpose": "...",
      "metrics": [{"name": "...", "value": "...", "unit": "...", "trend": "...", "context": "..."}],
      "interactive_elements": [{"type": "...", "name": "...", "options": ["..."], "purpose": "..."}],
      "chart_details": {"type": "...", "color_scheme": "...", "annotations": "..."},
      "key_insights": "...",
      "actionable_items": "..."
    }
  ],
  "global_controls": [{"type": "...", "name": "...", "purpose": "...", "impact": "..."}],
  "data_quality_indicators": {"freshness": "...", "completeness": "...", "accuracy": "..."},
  "performance_trends": {"overall_trend": "...", "key_drivers": "...", "anomalies": "..."}
}
Add sections and elements as the images require. No text outside the JSON."#;

const DOCUMENTATION_PROMPT_HEAD: &str = r#"You are a documentation architect. Write complete, professional dashboard documentation from the structured analysis below.

ANALYSIS DATA:
"#;

const DOCUMENTATION_PROMPT_TAIL: &str = r#"

Write all ten sections, in this order, with no placeholders and no "continued" notes:
1. Dashboard Name & High-Level Summary (title, short description, link to dashboard)
2. Purpose & Business Context (business questions, key use cases, domains)
3. Dashboard Views (one <h3> per section: description, key metrics, audience, navigation walkthrough, tips)
4. Key Metric Definitions (definition, data governance link, calculation logic)
5. Data Refresh & Update Cadence (schedule, pipeline, dependencies)
6. Ownership & Contacts (primary owner, channel, stakeholders)
7. Known Limitations & Assumptions (limitations, workarounds)
8. Frequently Asked Questions
9. Relevant Links / References
10. Change Log & Version History

Formatting:
- <h2 style="font-weight: bold;"> for the numbered sections, <h3 style="font-weight: bold;"> for subsections
- <strong> around every subsection label
- <ul><li> for bullet lists, <ol><li> for numbered lists
- When something is not visible in the analysis write "To be confirmed with data team"

Output ONLY the HTML documentation, with no conversational text."#;

const UNIFIED_PROMPT: &str = r#"You are a business intelligence expert writing a user guide for the dashboard shown in the images{scope}.

Report only what is clearly visible: filters, dropdowns, buttons, drill-downs, control names and options.

Use exactly these sections, in order, with <h2> headers and no blank line after a header:
<h2>Objective</h2>
<h2>New Enhanced [Dashboard Name] View</h2>
<h2>New Additions, Features and Changes</h2>
<h2>Detailed Overview</h2> with five numbered <h3> views, each with <strong>Metrics Reported</strong>, <strong>Data Source</strong> and <strong>View Specific Drill Down Control</strong>
<h2>Dashboard Controls</h2>
<h2>How tos</h2>

Start immediately with <h2>Objective</h2>. No other sections and no introductory text."#;

const DATA_ANALYSIS_DEFAULT_FOCUS: &str = "Analyze this business scorecard data and provide insights on:
1. Key performance metrics and trends
2. Business unit performance comparison
3. Target vs actual performance analysis
4. Notable patterns or anomalies
5. Recommendations for improvement

Focus on actionable insights for business decision making.";

const DASHBOARD_METADATA_DEFAULT_FOCUS: &str = "Analyze this QuickSight dashboard metadata and provide insights on:
1. Dashboard purpose and business value
2. Data visualization effectiveness
3. Potential improvements or optimizations
4. Key metrics and KPIs being tracked
5. Overall dashboard design assessment";

pub fn extraction_prompt() -> &'static str {
    EXTRACTION_PROMPT
}

pub fn documentation_prompt(analysis_data: &str) -> String {
    format!(
        "{}{}{}",
        DOCUMENTATION_PROMPT_HEAD, analysis_data, DOCUMENTATION_PROMPT_TAIL
    )
}

pub fn unified_prompt(image_count: usize) -> String {
    let scope = if image_count > 1 {
        " across multiple dashboard sections"
    } else {
        ""
    };
    UNIFIED_PROMPT.replace("{scope}", scope)
}

pub fn default_data_focus() -> &'static str {
    DATA_ANALYSIS_DEFAULT_FOCUS
}

pub fn data_analysis_prompt(summary: &DataSummary, focus: Option<&str>) -> String {
    let focus = focus.unwrap_or(DATA_ANALYSIS_DEFAULT_FOCUS);
    let sample = serde_json::to_string_pretty(&summary.sample_data).unwrap_or_default();

    format!(
        "{focus}\n\nHere's the business scorecard data summary:\n\n\
         Dataset Overview:\n\
         - Total Records: {total}\n\
         - Date Range: {start} to {end}\n\
         - Business Units: {units}\n\
         - Metrics: {metrics}\n\
         - Entry Types: {entries}\n\n\
         Sample Data:\n{sample}\n\n\
         Please provide a comprehensive analysis with specific insights and recommendations.",
        focus = focus,
        total = summary.total_records,
        start = summary.date_range.start,
        end = summary.date_range.end,
        units = summary.business_units.join(", "),
        metrics = summary.metrics_preview(10),
        entries = summary.entry_types.join(", "),
        sample = sample,
    )
}

pub fn default_dashboard_focus() -> &'static str {
    DASHBOARD_METADATA_DEFAULT_FOCUS
}

pub fn dashboard_metadata_prompt(analysis: &DashboardAnalysis, focus: Option<&str>) -> String {
    let focus = focus.unwrap_or(DASHBOARD_METADATA_DEFAULT_FOCUS);
    let metadata = serde_json::to_string_pretty(analysis).unwrap_or_default();

    format!(
        "{focus}\n\nDashboard Metadata:\n{metadata}\n\n\
         Please provide a comprehensive analysis with specific insights and actionable recommendations.",
        focus = focus,
        metadata = metadata,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_documentation_prompt_embeds_analysis() {
        let prompt = documentation_prompt("{\"dashboard_purpose\": \"Track care KPIs\"}");
        assert!(prompt.contains("Track care KPIs"));
        assert!(prompt.ends_with("no conversational text."));
    }

    #[test]
    fn test_unified_prompt_scope() {
        assert!(unified_prompt(3).contains("across multiple dashboard sections"));
        assert!(!unified_prompt(1).contains("{scope}"));
        assert!(!unified_prompt(1).contains("across multiple"));
    }

    #[test]
    fn test_dashboard_metadata_prompt() {
        use crate::core::DashboardDetails;
        let details = DashboardDetails {
            dashboard: serde_json::json!({"Name": "Care Scorecard"}),
            ..Default::default()
        };
        let analysis = DashboardAnalysis::from_details("dash-1", &details);

        let prompt = dashboard_metadata_prompt(&analysis, None);
        assert!(prompt.starts_with(default_dashboard_focus()));
        assert!(prompt.contains("\"name\": \"Care Scorecard\""));

        let custom = dashboard_metadata_prompt(&analysis, Some("Only list the filters."));
        assert!(custom.starts_with("Only list the filters."));
    }
}
