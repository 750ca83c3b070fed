//! Element resolver with fallback chain orchestration

use crate::{errors::LocatorError, stability::StabilityClassifier, strategies::*, types::*};
use dom_snapshot::{Document, NodeId};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Element resolver trait
pub trait ElementResolver: Send + Sync {
    /// Resolve a stored locator to one live element.
    ///
    /// Never fails: selector errors and misses fall through to the next
    /// strategy, and `None` means every strategy came up empty.
    fn resolve(&self, doc: &Document, request: &ResolveRequest) -> Option<ResolutionResult>;

    /// Like [`resolve`](Self::resolve), reporting an exhausted chain as
    /// [`LocatorError::ElementNotFound`]
    fn try_resolve(
        &self,
        doc: &Document,
        request: &ResolveRequest,
    ) -> Result<ResolutionResult, LocatorError> {
        self.resolve(doc, request)
            .ok_or_else(|| LocatorError::ElementNotFound(request.locator.to_string()))
    }

    /// Try to resolve with specific strategy
    fn resolve_with_strategy(
        &self,
        doc: &Document,
        request: &ResolveRequest,
        strategy: ResolveStrategy,
    ) -> Result<Vec<NodeId>, LocatorError>;
}

/// Default element resolver implementation
pub struct DefaultElementResolver {
    classifier: StabilityClassifier,
    xpath_strategy: Arc<XPathStrategy>,
    direct_strategy: Arc<DirectQueryStrategy>,
    toggle_strategy: Arc<ToggleRelaxStrategy>,
    text_strategy: Arc<TextHintStrategy>,
    path_strategy: Arc<PathRelaxStrategy>,
}

impl Default for DefaultElementResolver {
    fn default() -> Self {
        Self::new(StabilityClassifier::default())
    }
}

impl DefaultElementResolver {
    /// Create a new resolver with all strategies
    pub fn new(classifier: StabilityClassifier) -> Self {
        Self {
            classifier,
            xpath_strategy: Arc::new(XPathStrategy),
            direct_strategy: Arc::new(DirectQueryStrategy),
            toggle_strategy: Arc::new(ToggleRelaxStrategy),
            text_strategy: Arc::new(TextHintStrategy),
            path_strategy: Arc::new(PathRelaxStrategy),
        }
    }

    /// Get strategy by type
    fn get_strategy(&self, strategy_type: ResolveStrategy) -> Arc<dyn Strategy> {
        match strategy_type {
            ResolveStrategy::XPath => self.xpath_strategy.clone(),
            ResolveStrategy::DirectQuery => self.direct_strategy.clone(),
            ResolveStrategy::ToggleRelaxation => self.toggle_strategy.clone(),
            ResolveStrategy::TextHint => self.text_strategy.clone(),
            ResolveStrategy::PathRelaxation => self.path_strategy.clone(),
        }
    }

    /// Whether the locator embeds an id-like value carrying a generated-code
    /// signature. Such locators skip the structural strategies.
    pub fn is_poisoned(&self, locator: &Locator) -> bool {
        locator
            .identifier_payloads()
            .iter()
            .filter(|(attr, _)| attr == "id" || attr == "for" || attr.starts_with("data-"))
            .any(|(_, value)| self.classifier.is_poisoned(value))
    }
}

impl ElementResolver for DefaultElementResolver {
    fn resolve(&self, doc: &Document, request: &ResolveRequest) -> Option<ResolutionResult> {
        debug!("Resolving element: {}", request.locator);
        let poisoned = self.is_poisoned(&request.locator);
        if poisoned {
            warn!("Locator looks generated, skipping to text hint: {}", request.locator);
        }

        for strategy_type in ResolveStrategy::fallback_chain() {
            if poisoned
                && matches!(
                    strategy_type,
                    ResolveStrategy::DirectQuery | ResolveStrategy::ToggleRelaxation
                )
            {
                continue;
            }
            let strategy = self.get_strategy(strategy_type);

            match strategy.resolve(doc, request) {
                Ok(candidates) if !candidates.is_empty() => {
                    let node = candidates[0];
                    info!(
                        "Resolved element using {} strategy: node {} ({} candidates)",
                        strategy_type.name(),
                        node.0,
                        candidates.len()
                    );
                    return Some(ResolutionResult {
                        node,
                        strategy: strategy_type,
                    });
                }
                Ok(_) => {
                    debug!("Strategy {} returned no candidates", strategy_type.name());
                }
                Err(e) => {
                    debug!("Strategy {} rejected locator: {}", strategy_type.name(), e);
                }
            }
        }

        debug!("All strategies exhausted for locator: {}", request.locator);
        None
    }

    fn resolve_with_strategy(
        &self,
        doc: &Document,
        request: &ResolveRequest,
        strategy_type: ResolveStrategy,
    ) -> Result<Vec<NodeId>, LocatorError> {
        self.get_strategy(strategy_type).resolve(doc, request)
    }
}
