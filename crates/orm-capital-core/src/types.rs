use serde::{Deserialize, Serialize};

/// All monetary values. Wraps Decimal to prevent accidental f64 usage.
pub type Money = rust_decimal::Decimal;

/// Rates and coefficients expressed as decimals (0.05 = 5%). Never as percentages.
pub type Rate = rust_decimal::Decimal;

/// The three supported operational-risk methodologies (§4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Methodology {
    Sma,
    Bia,
    Tsa,
}

impl std::fmt::Display for Methodology {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Methodology::Sma => write!(f, "sma"),
            Methodology::Bia => write!(f, "bia"),
            Methodology::Tsa => write!(f, "tsa"),
        }
    }
}

/// Basel operational-risk event-type taxonomy (seven categories).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    InternalFraud,
    ExternalFraud,
    EmploymentPracticesAndWorkplaceSafety,
    ClientsProductsAndBusinessPractices,
    DamageToPhysicalAssets,
    BusinessDisruptionAndSystemFailures,
    ExecutionDeliveryAndProcessManagement,
}

/// Basel business-line taxonomy (eight lines); shared by loss attribution and TSA.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BusinessLine {
    CorporateFinance,
    TradingAndSales,
    RetailBanking,
    CommercialBanking,
    PaymentAndSettlement,
    AgencyServices,
    AssetManagement,
    RetailBrokerage,
}

/// RBI size classification of an entity by 3-year-average Business Indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Bucket {
    One,
    Two,
    Three,
}

impl Bucket {
    pub fn as_u8(&self) -> u8 {
        match self {
            Bucket::One => 1,
            Bucket::Two => 2,
            Bucket::Three => 3,
        }
    }
}

/// A single violation surfaced by tier-1 validation (§7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationError {
    pub error_code: String,
    pub error_message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ValidationError {
    pub fn new(error_code: impl Into<String>, error_message: impl Into<String>) -> Self {
        Self {
            error_code: error_code.into(),
            error_message: error_message.into(),
            field: None,
            details: None,
        }
    }

    pub fn on_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }
}

/// Tier-1 validation outcome (§7). Never thrown — always returned as data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub success: bool,
    pub records_processed: u32,
    pub records_accepted: u32,
    pub records_rejected: u32,
    pub errors: Vec<ValidationError>,
}

impl ValidationResult {
    pub fn accepted(records_processed: u32) -> Self {
        Self {
            success: true,
            records_processed,
            records_accepted: records_processed,
            records_rejected: 0,
            errors: Vec::new(),
        }
    }

    pub fn rejected(records_processed: u32, errors: Vec<ValidationError>) -> Self {
        Self {
            success: false,
            records_processed,
            records_accepted: 0,
            records_rejected: records_processed,
            errors,
        }
    }
}

/// The wire error envelope (§6), attached to every fatal-tier response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub error_code: String,
    pub error_message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl From<&crate::error::OrmError> for ErrorEnvelope {
    fn from(e: &crate::error::OrmError) -> Self {
        Self {
            error_code: e.error_code().to_string(),
            error_message: e.to_string(),
            details: None,
        }
    }
}

/// Metadata for every computation (shared by analytics envelopes, §4.10).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Standard computation output envelope used by the analytics engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Wrap a computation result with standard metadata.
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}
