//! Bookkeeping for labels printed into the console, so a font or color
//! change can be applied to everything already on screen.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use typist_types::error::{Result, TypistError};
use typist_types::output::{LabelStyle, StyledLabel};

struct Inner {
    style: LabelStyle,
    labels: Vec<Arc<dyn StyledLabel>>,
}

/// Labels currently shown in the console.
pub struct PrintedLabels {
    inner: Mutex<Inner>,
}

impl PrintedLabels {
    /// An empty tracker drawing new labels in `style`.
    pub fn new(style: LabelStyle) -> Self {
        Self {
            inner: Mutex::new(Inner {
                style,
                labels: Vec::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Track `label` and give it the current style.
    pub fn add(&self, label: Arc<dyn StyledLabel>) -> Result<()> {
        let mut inner = self.lock();
        if inner.labels.iter().any(|l| Arc::ptr_eq(l, &label)) {
            return Err(TypistError::Label("label is already tracked".into()));
        }
        label.apply_style(&inner.style);
        inner.labels.push(label);
        Ok(())
    }

    /// Stop tracking `label`. Fails if it was never added.
    pub fn remove(&self, label: &Arc<dyn StyledLabel>) -> Result<()> {
        let mut inner = self.lock();
        let index = inner
            .labels
            .iter()
            .position(|l| Arc::ptr_eq(l, label))
            .ok_or_else(|| TypistError::Label("label is not tracked".into()))?;
        inner.labels.remove(index);
        Ok(())
    }

    /// Forget every tracked label.
    pub fn clear(&self) {
        self.lock().labels.clear();
    }

    /// Apply a new style to every tracked label and to labels added later.
    pub fn restyle(&self, style: LabelStyle) {
        let mut inner = self.lock();
        for label in &inner.labels {
            label.apply_style(&style);
        }
        log::debug!("Restyled {} printed labels", inner.labels.len());
        inner.style = style;
    }

    /// The style applied to new labels.
    pub fn style(&self) -> LabelStyle {
        self.lock().style.clone()
    }

    /// Number of tracked labels.
    pub fn len(&self) -> usize {
        self.lock().labels.len()
    }

    /// Whether no labels are tracked.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use typist_types::config::ConsoleConfig;
    use typist_types::output::Rgb;

    #[derive(Default)]
    struct Label {
        applied: Mutex<Vec<LabelStyle>>,
    }

    impl StyledLabel for Label {
        fn apply_style(&self, style: &LabelStyle) {
            self.applied.lock().unwrap().push(style.clone());
        }
    }

    fn default_style() -> LabelStyle {
        LabelStyle::from_config(&ConsoleConfig::default()).unwrap()
    }

    #[test]
    fn add_applies_current_style() {
        let labels = PrintedLabels::new(default_style());
        let label = Arc::new(Label::default());
        labels.add(label.clone()).unwrap();
        assert_eq!(labels.len(), 1);
        assert_eq!(label.applied.lock().unwrap().as_slice(), &[default_style()]);
    }

    #[test]
    fn duplicate_add_is_rejected() {
        let labels = PrintedLabels::new(default_style());
        let label: Arc<dyn StyledLabel> = Arc::new(Label::default());
        labels.add(label.clone()).unwrap();
        assert!(matches!(labels.add(label), Err(TypistError::Label(_))));
        assert_eq!(labels.len(), 1);
    }

    #[test]
    fn remove_untracked_is_an_error() {
        let labels = PrintedLabels::new(default_style());
        let label: Arc<dyn StyledLabel> = Arc::new(Label::default());
        assert!(labels.remove(&label).is_err());
        labels.add(label.clone()).unwrap();
        labels.remove(&label).unwrap();
        assert!(labels.is_empty());
    }

    #[test]
    fn restyle_reaches_every_label() {
        let labels = PrintedLabels::new(default_style());
        let first = Arc::new(Label::default());
        let second = Arc::new(Label::default());
        labels.add(first.clone()).unwrap();
        labels.add(second.clone()).unwrap();

        let style = LabelStyle {
            foreground: Rgb::new(255, 0, 0),
            ..default_style()
        };
        labels.restyle(style.clone());
        assert_eq!(first.applied.lock().unwrap().last(), Some(&style));
        assert_eq!(second.applied.lock().unwrap().last(), Some(&style));
        assert_eq!(labels.style(), style);

        labels.clear();
        assert!(labels.is_empty());
    }
}
