//! Structural analysis of a BI dashboard from its API metadata.
//!
//! Everything here is pure: it reads the raw describe/definition/dataset
//! documents and produces the counts and heuristics that go into the prompt
//! and the report.

use crate::domain::model::DashboardDetails;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetInfo {
    pub id: String,
    pub name: String,
    /// SPICE or DIRECT_QUERY
    pub import_mode: String,
    pub created_time: Option<String>,
    pub last_updated_time: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardMetadata {
    pub dashboard_id: String,
    pub name: String,
    pub version: u64,
    pub status: String,
    pub created_time: Option<String>,
    pub last_updated_time: Option<String>,
    pub last_published_time: Option<String>,
    pub sheets_count: usize,
    pub datasets: Vec<DatasetInfo>,
    pub theme_arn: Option<String>,
    pub source_entity_arn: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetInfo {
    pub name: String,
    pub visual_types: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedItem {
    pub name: String,
    /// Expression for calculated fields, value type for parameters.
    pub detail: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DefinitionAnalysis {
    pub sheets_count: usize,
    pub sheets: Vec<SheetInfo>,
    pub visuals_count: usize,
    pub visual_types: BTreeMap<String, usize>,
    pub filters_count: usize,
    pub calculated_fields: Vec<NamedItem>,
    pub parameters: Vec<NamedItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasetAnalysis {
    pub total_datasets: usize,
    pub import_modes: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnicalInsights {
    /// 1 low, 2 medium, 3 high
    pub complexity_score: u8,
    pub performance_considerations: Vec<String>,
    pub best_practices: Vec<String>,
    pub potential_issues: Vec<String>,
}

impl TechnicalInsights {
    pub fn complexity_label(&self) -> &'static str {
        match self.complexity_score {
            1 => "Low",
            2 => "Medium",
            _ => "High",
        }
    }
}

/// 送進分析提示、也寫進 JSON 報告的完整結果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardAnalysis {
    pub metadata: DashboardMetadata,
    pub definition: Option<DefinitionAnalysis>,
    pub datasets: DatasetAnalysis,
    pub insights: TechnicalInsights,
}

fn text(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_string)
}

fn items<'a>(value: &'a Value, key: &str) -> &'a [Value] {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// The API sends epoch seconds; some exports carry ISO strings already.
pub fn timestamp(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => {
            let secs = n.as_f64()?;
            chrono::DateTime::from_timestamp(secs as i64, 0).map(|d| d.to_rfc3339())
        }
        _ => None,
    }
}

/// `BarChartVisual` → `Bar Chart`, `KPIVisual` → `KPI`.
pub fn visual_type(visual: &Value) -> String {
    let Some(key) = visual.as_object().and_then(|o| o.keys().next()) else {
        return "Other".to_string();
    };
    let base = key.strip_suffix("Visual").unwrap_or(key.as_str());

    let mut out = String::new();
    let mut prev_lower = false;
    for c in base.chars() {
        if c.is_uppercase() && prev_lower {
            out.push(' ');
        }
        prev_lower = c.is_lowercase();
        out.push(c);
    }
    if out.is_empty() {
        "Other".to_string()
    } else {
        out
    }
}

/// Dataset id from a dataset ARN (`...:dataset/<id>`).
pub fn dataset_id_from_arn(arn: &str) -> Option<&str> {
    arn.rsplit_once("dataset/")
        .map(|(_, id)| id)
        .filter(|id| !id.is_empty())
}

/// Dataset ids referenced by a dashboard definition, in declaration order.
pub fn referenced_dataset_ids(definition: &Value) -> Vec<String> {
    let mut ids: Vec<String> = Vec::new();
    for declaration in items(definition, "DataSetIdentifierDeclarations") {
        let id = declaration
            .get("DataSetArn")
            .and_then(Value::as_str)
            .and_then(dataset_id_from_arn)
            .map(str::to_string)
            .or_else(|| text(declaration, "Identifier"));
        if let Some(id) = id {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
    }
    ids
}

impl DatasetInfo {
    pub fn from_api(dataset: &Value) -> Self {
        Self {
            id: text(dataset, "DataSetId").unwrap_or_else(|| "Unknown".to_string()),
            name: text(dataset, "Name").unwrap_or_else(|| "Unknown".to_string()),
            import_mode: text(dataset, "ImportMode").unwrap_or_else(|| "Unknown".to_string()),
            created_time: timestamp(dataset.get("CreatedTime")),
            last_updated_time: timestamp(dataset.get("LastUpdatedTime")),
        }
    }
}

impl DefinitionAnalysis {
    pub fn from_definition(definition: &Value) -> Self {
        let mut analysis = DefinitionAnalysis::default();

        for sheet in items(definition, "Sheets") {
            let visual_types: Vec<String> = items(sheet, "Visuals").iter().map(visual_type).collect();
            for kind in &visual_types {
                *analysis.visual_types.entry(kind.clone()).or_insert(0) += 1;
            }
            analysis.visuals_count += visual_types.len();
            analysis.sheets.push(SheetInfo {
                name: text(sheet, "Name").unwrap_or_else(|| "Unnamed Sheet".to_string()),
                visual_types,
            });
        }
        analysis.sheets_count = analysis.sheets.len();
        analysis.filters_count = items(definition, "FilterGroups").len();

        analysis.calculated_fields = items(definition, "CalculatedFields")
            .iter()
            .map(|field| NamedItem {
                name: text(field, "Name").unwrap_or_else(|| "Unknown".to_string()),
                detail: text(field, "Expression").unwrap_or_default(),
            })
            .collect();

        // 每個宣告只有一個 key，例如 StringParameterDeclaration
        analysis.parameters = items(definition, "ParameterDeclarations")
            .iter()
            .filter_map(|declaration| declaration.as_object()?.iter().next())
            .map(|(kind, body)| NamedItem {
                name: text(body, "Name").unwrap_or_else(|| "Unknown".to_string()),
                detail: kind
                    .strip_suffix("ParameterDeclaration")
                    .unwrap_or(kind.as_str())
                    .to_string(),
            })
            .collect();

        analysis
    }
}

impl DatasetAnalysis {
    pub fn from_datasets(datasets: &[DatasetInfo]) -> Self {
        let mut import_modes = BTreeMap::new();
        for dataset in datasets {
            *import_modes.entry(dataset.import_mode.clone()).or_insert(0) += 1;
        }
        Self {
            total_datasets: datasets.len(),
            import_modes,
        }
    }
}

impl TechnicalInsights {
    pub fn assess(metadata: &DashboardMetadata, definition: Option<&DefinitionAnalysis>) -> Self {
        let mut factors = 0;
        let mut insights = TechnicalInsights {
            complexity_score: 1,
            performance_considerations: Vec::new(),
            best_practices: Vec::new(),
            potential_issues: Vec::new(),
        };

        if metadata.sheets_count > 10 {
            factors += 3;
            insights
                .potential_issues
                .push("Very high sheet count - consider dashboard consolidation".to_string());
        } else if metadata.sheets_count > 5 {
            factors += 2;
            insights
                .performance_considerations
                .push("High number of sheets may impact loading performance".to_string());
        }

        let visuals = definition.map(|d| d.visuals_count).unwrap_or(0);
        if visuals > 50 {
            factors += 3;
            insights
                .potential_issues
                .push("Extremely high visual count - performance risk".to_string());
        } else if visuals > 20 {
            factors += 2;
            insights
                .performance_considerations
                .push("High visual count may slow down rendering".to_string());
        }

        if metadata.datasets.len() > 3 {
            factors += 1;
            insights
                .performance_considerations
                .push("Multiple datasets may increase query complexity".to_string());
        }

        insights.complexity_score = match factors {
            0..=2 => 1,
            3..=4 => 2,
            _ => 3,
        };

        if metadata.last_published_time.is_some() {
            insights
                .best_practices
                .push("Dashboard has been published".to_string());
        }
        if metadata.last_updated_time.is_none() {
            insights
                .potential_issues
                .push("Dashboard may be outdated".to_string());
        }

        insights
    }
}

impl DashboardAnalysis {
    pub fn from_details(dashboard_id: &str, details: &DashboardDetails) -> Self {
        let dashboard = &details.dashboard;
        let version = dashboard.get("Version").cloned().unwrap_or(Value::Null);
        let definition = details.definition.as_ref().map(DefinitionAnalysis::from_definition);
        let datasets: Vec<DatasetInfo> = details.datasets.iter().map(DatasetInfo::from_api).collect();

        let metadata = DashboardMetadata {
            dashboard_id: dashboard_id.to_string(),
            name: text(dashboard, "Name").unwrap_or_else(|| dashboard_id.to_string()),
            version: version.get("VersionNumber").and_then(Value::as_u64).unwrap_or(0),
            status: text(&version, "Status").unwrap_or_else(|| "Unknown".to_string()),
            created_time: timestamp(dashboard.get("CreatedTime")),
            last_updated_time: timestamp(dashboard.get("LastUpdatedTime")),
            last_published_time: timestamp(dashboard.get("LastPublishedTime")),
            sheets_count: definition
                .as_ref()
                .map(|d| d.sheets_count)
                .unwrap_or_else(|| items(&version, "Sheets").len()),
            datasets,
            theme_arn: text(&version, "ThemeArn"),
            source_entity_arn: text(&version, "SourceEntityArn"),
        };

        let insights = TechnicalInsights::assess(&metadata, definition.as_ref());
        Self {
            datasets: DatasetAnalysis::from_datasets(&metadata.datasets),
            metadata,
            definition,
            insights,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn definition() -> Value {
        json!({
            "DataSetIdentifierDeclarations": [
                {"Identifier": "scorecard", "DataSetArn": "arn:aws:quicksight:us-west-2:123:dataset/ds-1"},
                {"Identifier": "targets", "DataSetArn": "arn:aws:quicksight:us-west-2:123:dataset/ds-2"}
            ],
            "Sheets": [
                {"Name": "Overview", "Visuals": [
                    {"BarChartVisual": {"VisualId": "v1"}},
                    {"KPIVisual": {"VisualId": "v2"}}
                ]},
                {"Name": "Detail", "Visuals": [{"PivotTableVisual": {"VisualId": "v3"}}]}
            ],
            "FilterGroups": [{"FilterGroupId": "f1"}],
            "CalculatedFields": [{"Name": "Gap", "Expression": "actual - target"}],
            "ParameterDeclarations": [{"StringParameterDeclaration": {"Name": "Region"}}]
        })
    }

    #[test]
    fn test_visual_type_names() {
        assert_eq!(visual_type(&json!({"BarChartVisual": {}})), "Bar Chart");
        assert_eq!(visual_type(&json!({"KPIVisual": {}})), "KPI");
        assert_eq!(visual_type(&json!({"GeospatialMapVisual": {}})), "Geospatial Map");
        assert_eq!(visual_type(&json!("bogus")), "Other");
    }

    #[test]
    fn test_definition_analysis() {
        let analysis = DefinitionAnalysis::from_definition(&definition());
        assert_eq!(analysis.sheets_count, 2);
        assert_eq!(analysis.visuals_count, 3);
        assert_eq!(analysis.visual_types.get("Bar Chart"), Some(&1));
        assert_eq!(analysis.sheets[1].visual_types, vec!["Pivot Table"]);
        assert_eq!(analysis.filters_count, 1);
        assert_eq!(analysis.calculated_fields[0].detail, "actual - target");
        assert_eq!(
            analysis.parameters,
            vec![NamedItem {
                name: "Region".to_string(),
                detail: "String".to_string()
            }]
        );
        assert_eq!(referenced_dataset_ids(&definition()), vec!["ds-1", "ds-2"]);
    }

    #[test]
    fn test_timestamps_from_epoch_seconds() {
        assert_eq!(
            timestamp(Some(&json!(1735689600.0))),
            Some("2025-01-01T00:00:00+00:00".to_string())
        );
        assert_eq!(timestamp(Some(&json!("2025-01-01"))), Some("2025-01-01".to_string()));
        assert_eq!(timestamp(None), None);
    }

    #[test]
    fn test_complexity_thresholds() {
        let sheets: Vec<Value> = (0..6)
            .map(|i| {
                let visuals = vec![json!({"TableVisual": {}}); 4];
                json!({"Name": format!("S{}", i), "Visuals": visuals})
            })
            .collect();
        let details = DashboardDetails {
            dashboard: json!({"Name": "Care", "LastPublishedTime": 1735689600}),
            definition: Some(json!({ "Sheets": sheets })),
            datasets: vec![json!({"DataSetId": "a"}); 4],
        };
        let analysis = DashboardAnalysis::from_details("dash-1", &details);

        // 6 sheets (+2), 24 visuals (+2), 4 datasets (+1)
        assert_eq!(analysis.insights.complexity_score, 3);
        assert_eq!(analysis.insights.complexity_label(), "High");
        assert_eq!(analysis.insights.performance_considerations.len(), 3);
        assert_eq!(analysis.insights.best_practices, vec!["Dashboard has been published"]);
        assert_eq!(analysis.insights.potential_issues, vec!["Dashboard may be outdated"]);
        assert_eq!(analysis.datasets.import_modes.get("Unknown"), Some(&4));
    }

    #[test]
    fn test_small_dashboard_is_low_complexity() {
        let details = DashboardDetails {
            dashboard: json!({
                "Name": "Care Scorecard",
                "LastUpdatedTime": 1735689600,
                "Version": {"VersionNumber": 7, "Status": "CREATION_SUCCESSFUL"}
            }),
            definition: Some(definition()),
            datasets: vec![json!({"DataSetId": "ds-1", "Name": "Scorecard", "ImportMode": "SPICE"})],
        };
        let analysis = DashboardAnalysis::from_details("dash-1", &details);
        assert_eq!(analysis.metadata.name, "Care Scorecard");
        assert_eq!(analysis.metadata.version, 7);
        assert_eq!(analysis.metadata.sheets_count, 2);
        assert_eq!(analysis.insights.complexity_score, 1);
        assert!(analysis.insights.potential_issues.is_empty());
    }
}
