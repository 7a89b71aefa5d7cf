pub mod prompts;

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use uuid::Uuid;

use crate::ai::provider::TextGenerator;
use crate::config::EngineConfig;
use crate::error::AppError;
use crate::measure::chart::{NormalizedSizeChart, RawTable, SizeChartNormalizer};
use crate::measure::selector::{MeasurementSelector, RelevantMeasurements, UserProfile};
use crate::measure::stretch::{Material, MaterialStretchEstimator, StretchFactor};
use crate::measure::vocabulary::Vocabulary;
use crate::recommend::parser::parse_recommendation;
use crate::recommend::policy::{generate_with_retry, RetryPolicy, Sleeper, TokioSleeper};
use crate::recommend::record::RecommendationRecord;

/// Product details handed over by the page scraper.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductData {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub fit: Option<String>,
    #[serde(default)]
    pub available_sizes: Vec<String>,
    /// Pipe-delimited chart text.
    #[serde(default)]
    pub size_chart: Option<String>,
    /// Chart cells, when the scraper extracted a table instead of text.
    #[serde(default)]
    pub size_table: Option<RawTable>,
    #[serde(default)]
    pub materials: Vec<Material>,
    #[serde(default)]
    pub fit_feedback: Vec<FitFeedback>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitFeedback {
    pub aspect: String,
    pub response: String,
    pub percentage: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialProperties {
    pub stretch: StretchFactor,
    pub materials: Vec<Material>,
}

/// Outcome of one analysis, handed to the storage collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SizeAnalysis {
    pub session_id: Uuid,
    pub url: String,
    pub timestamp_ms: u64,
    pub size_recommendation: RecommendationRecord,
    pub size_chart: Option<NormalizedSizeChart>,
    pub user_measurements: RelevantMeasurements,
    pub material_properties: MaterialProperties,
}

impl SizeAnalysis {
    pub fn storage_key(&self) -> String {
        format!("analysis_{}", self.url)
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// The synchronous normalization components, built from one vocabulary.
#[derive(Debug, Clone)]
pub struct SizeEngine {
    pub normalizer: SizeChartNormalizer,
    pub selector: MeasurementSelector,
    pub stretch: MaterialStretchEstimator,
}

impl SizeEngine {
    pub fn new(vocabulary: &Vocabulary) -> Self {
        Self {
            normalizer: vocabulary.chart_normalizer(),
            selector: vocabulary.measurement_selector(),
            stretch: vocabulary.stretch_estimator(),
        }
    }

    /// Normalize the scraped chart, falling back to a size-only chart when the
    /// scraped one is unusable.
    pub fn resolve_chart(&self, product: &ProductData) -> Option<NormalizedSizeChart> {
        let scraped = product
            .size_chart
            .as_deref()
            .and_then(|raw| self.normalizer.normalize(raw))
            .or_else(|| {
                product
                    .size_table
                    .as_ref()
                    .and_then(|t| self.normalizer.normalize_table(t))
            });

        match scraped {
            Some(chart) => Some(chart),
            None if !product.available_sizes.is_empty() => {
                log::info!(
                    "[analysis] No usable size chart, falling back to {} listed sizes",
                    product.available_sizes.len()
                );
                Some(NormalizedSizeChart::from_sizes(&product.available_sizes))
            }
            None => None,
        }
    }
}

struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Runs the measurement -> prompt -> generation -> parse pipeline, one analysis at a time.
pub struct AnalysisSession {
    id: Uuid,
    engine: SizeEngine,
    generator: Arc<dyn TextGenerator>,
    policy: RetryPolicy,
    timeout: Option<Duration>,
    sleeper: Arc<dyn Sleeper>,
    in_progress: AtomicBool,
}

impl AnalysisSession {
    pub fn new(engine: SizeEngine, generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            id: Uuid::new_v4(),
            engine,
            generator,
            policy: RetryPolicy::default(),
            timeout: None,
            sleeper: Arc::new(TokioSleeper),
            in_progress: AtomicBool::new(false),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Result<Self, AppError> {
        let engine = SizeEngine::new(&config.vocabulary()?);
        let generator: Arc<dyn TextGenerator> = Arc::from(crate::ai::create_generator(config)?);
        Ok(Self::new(engine, generator)
            .with_policy(config.retry_policy())
            .with_timeout(config.generation_timeout()))
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Bound each generation call; an expired call ends the analysis as `Cancelled`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn engine(&self) -> &SizeEngine {
        &self.engine
    }

    pub fn is_busy(&self) -> bool {
        self.in_progress.load(Ordering::SeqCst)
    }

    pub async fn analyze(
        &self,
        product: &ProductData,
        profile: &UserProfile,
    ) -> Result<SizeAnalysis, AppError> {
        if self.in_progress.swap(true, Ordering::SeqCst) {
            return Err(AppError::AnalysisInProgress);
        }
        let _busy = BusyGuard(&self.in_progress);

        log::info!("[analysis] Starting analysis for {}", product.url);
        let result = self.run(product, profile).await;
        match &result {
            Ok(analysis) => log::info!(
                "[analysis] Recommended {} ({})",
                analysis.size_recommendation.size,
                analysis.size_recommendation.confidence.as_str()
            ),
            Err(e) => log::warn!("[analysis] Failed: {}", e),
        }
        result
    }

    async fn run(
        &self,
        product: &ProductData,
        profile: &UserProfile,
    ) -> Result<SizeAnalysis, AppError> {
        let category = product.category.as_deref().unwrap_or_default();
        let measurements = self.engine.selector.select_required(category, profile)?;
        let chart = self.engine.resolve_chart(product);
        let stretch = self.engine.stretch.estimate(&product.materials);

        let prompt = prompts::build_analysis_prompt(
            product,
            chart.as_ref(),
            &measurements,
            profile,
            stretch,
        );
        log::debug!("[analysis] Prompt:\n{}", prompt);

        let this = self;
        let prompt_ref = prompt.as_str();
        let response = generate_with_retry(
            move || this.call_generator(prompt_ref),
            &self.policy,
            self.sleeper.as_ref(),
        )
        .await?;
        let recommendation = parse_recommendation(&response)?;

        Ok(SizeAnalysis {
            session_id: self.id,
            url: product.url.clone(),
            timestamp_ms: now_ms(),
            size_recommendation: recommendation,
            size_chart: chart,
            user_measurements: measurements,
            material_properties: MaterialProperties {
                stretch,
                materials: product.materials.clone(),
            },
        })
    }

    async fn call_generator(&self, prompt: &str) -> Result<String, AppError> {
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.generator.generate(prompt))
                .await
                .map_err(|_| AppError::Cancelled(format!("no response within {:?}", limit)))?,
            None => self.generator.generate(prompt).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tokio::sync::Notify;

    use crate::recommend::record::{ConfidenceLevel, FitType};

    const RESPONSE: &str = "MEASUREMENTS ANALYSIS:\nChest 94cm sits between S (91.4) and M (96.5).\n\nBEST SIZE: M\nCONFIDENCE: high\nREASONING: chest matches\nFIT TYPE: regular\n\nKEY MEASUREMENTS:\n- chest: 94cm vs 96.5cm\n\nPOTENTIAL ISSUES:\n- none\n\nALTERNATIVE SIZES:\n- S: for a fitted look";

    struct ScriptedGenerator {
        responses: Mutex<VecDeque<Result<String, AppError>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedGenerator {
        fn new(responses: Vec<Result<String, AppError>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into_iter().collect()),
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl TextGenerator for ScriptedGenerator {
        async fn generate(&self, prompt: &str) -> Result<String, AppError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(AppError::AiProviderError("script exhausted".into())))
        }
    }

    struct NoSleep;

    #[async_trait]
    impl Sleeper for NoSleep {
        async fn sleep(&self, _duration: Duration) {}
    }

    fn engine() -> SizeEngine {
        SizeEngine::new(&Vocabulary::builtin().unwrap())
    }

    fn session(generator: Arc<dyn TextGenerator>) -> AnalysisSession {
        AnalysisSession::new(engine(), generator).with_sleeper(Arc::new(NoSleep))
    }

    fn product() -> ProductData {
        ProductData {
            url: "https://shop.example/p/42".into(),
            title: Some("Crew Tee".into()),
            category: Some("T-Shirt".into()),
            available_sizes: vec!["S".into(), "M".into()],
            size_chart: Some("Size | Chest (in)\n--- | ---\nS | 36\nM | 38".into()),
            materials: vec![Material::new("cotton", 95.0), Material::new("elastane", 5.0)],
            ..ProductData::default()
        }
    }

    fn profile() -> UserProfile {
        UserProfile::default()
            .with_measurement("chest", "94")
            .with_measurement("neck", "37")
    }

    #[tokio::test]
    async fn test_full_pipeline() {
        let generator = ScriptedGenerator::new(vec![Ok(RESPONSE.to_string())]);
        let session = session(generator.clone());
        let analysis = session.analyze(&product(), &profile()).await.unwrap();

        assert_eq!(analysis.session_id, session.id());
        assert_eq!(analysis.storage_key(), "analysis_https://shop.example/p/42");
        assert_eq!(analysis.size_recommendation.size, "M");
        assert_eq!(analysis.size_recommendation.confidence, ConfidenceLevel::High);
        assert_eq!(analysis.size_recommendation.fit_type, Some(FitType::Regular));
        assert_eq!(analysis.user_measurements.len(), 1);
        assert_eq!(analysis.material_properties.stretch, 1);
        let chart = analysis.size_chart.unwrap();
        assert_eq!(chart.value("M", "chest"), Some(96.5));

        let prompts = generator.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("S | 91.4"));
        assert!(!prompts[0].contains("neck"));
        assert!(!session.is_busy());
    }

    #[tokio::test]
    async fn test_retries_malformed_response() {
        let generator = ScriptedGenerator::new(vec![
            Ok("Je recommande la taille M".to_string()),
            Ok(RESPONSE.to_string()),
        ]);
        let analysis = session(generator.clone())
            .analyze(&product(), &profile())
            .await
            .unwrap();
        assert_eq!(analysis.size_recommendation.size, "M");
        assert_eq!(generator.prompts.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_no_relevant_measurements_skips_generation() {
        let generator = ScriptedGenerator::new(vec![Ok(RESPONSE.to_string())]);
        let profile = UserProfile::default().with_measurement("inseam", "80");
        let err = session(generator.clone())
            .analyze(&product(), &profile)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NoRelevantMeasurements));
        assert!(generator.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_exhausted_attempts_propagate_format_error() {
        let generator = ScriptedGenerator::new(vec![
            Ok("nothing useful".to_string()),
            Ok("still nothing".to_string()),
            Ok("BEST SIZE: M".to_string()),
        ]);
        let err = session(generator.clone())
            .analyze(&product(), &profile())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidAiResponseFormat(_)));
        assert_eq!(generator.prompts.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_fallback_chart_from_sizes() {
        let generator = ScriptedGenerator::new(vec![Ok(RESPONSE.to_string())]);
        let mut product = product();
        product.size_chart = Some("Size | Fit\nS | Standard S measurements".into());
        let analysis = session(generator.clone())
            .analyze(&product, &profile())
            .await
            .unwrap();
        let chart = analysis.size_chart.unwrap();
        assert_eq!(chart.sizes(), vec!["S", "M"]);
        assert!(chart.headers.is_empty());
    }

    #[test]
    fn test_resolve_chart_prefers_text_then_table() {
        let engine = engine();
        let mut product = ProductData {
            size_table: Some(RawTable {
                headers: vec!["Size".into(), "Waist".into()],
                rows: vec![vec!["32".into(), "81".into()]],
            }),
            ..ProductData::default()
        };
        let chart = engine.resolve_chart(&product).unwrap();
        assert_eq!(chart.value("32", "waist"), Some(81.0));

        product.size_chart = Some("Size | Waist\n34 | 86".into());
        let chart = engine.resolve_chart(&product).unwrap();
        assert_eq!(chart.sizes(), vec!["34"]);

        assert!(engine.resolve_chart(&ProductData::default()).is_none());
    }

    struct BlockingGenerator {
        release: Notify,
    }

    #[async_trait]
    impl TextGenerator for BlockingGenerator {
        async fn generate(&self, _prompt: &str) -> Result<String, AppError> {
            self.release.notified().await;
            Ok(RESPONSE.to_string())
        }
    }

    #[tokio::test]
    async fn test_second_analysis_rejected_while_busy() {
        let generator = Arc::new(BlockingGenerator {
            release: Notify::new(),
        });
        let session = session(generator.clone());
        let product = product();
        let profile = profile();

        let (first, second) = tokio::join!(session.analyze(&product, &profile), async {
            let second = session.analyze(&product, &profile).await;
            generator.release.notify_one();
            second
        });

        assert!(first.is_ok());
        assert!(matches!(second, Err(AppError::AnalysisInProgress)));
        assert!(!session.is_busy());
    }

    #[tokio::test]
    async fn test_timeout_cancels_without_retry() {
        let generator = Arc::new(BlockingGenerator {
            release: Notify::new(),
        });
        let session = session(generator).with_timeout(Some(Duration::from_millis(20)));
        let err = session.analyze(&product(), &profile()).await.unwrap_err();
        assert!(matches!(err, AppError::Cancelled(_)));
        assert!(!session.is_busy());
    }

    #[test]
    fn test_product_deserializes_from_scraper_payload() {
        let json = r#"{
            "url": "https://shop.example/p/7",
            "category": "pants",
            "availableSizes": ["30", "32"],
            "sizeChart": "Size | Waist\n30 | 76",
            "materials": [{"material": "cotton", "percentage": 98}],
            "fitFeedback": [{"aspect": "Length", "response": "Runs long", "percentage": 40}]
        }"#;
        let product: ProductData = serde_json::from_str(json).unwrap();
        assert_eq!(product.available_sizes, vec!["30", "32"]);
        assert_eq!(product.materials[0].percentage, 98.0);
        assert!(product.size_table.is_none());
    }
}
