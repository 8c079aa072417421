//! Record filters
//!
//! Filters run once per record on the producing thread, before the record
//! is frozen. They may enrich the record (add fields, rewrite the text) or
//! reject it by returning an error, in which case no sink sees it.

use crate::error::Result;
use crate::record::RecordBuilder;

pub trait Filter: Send + Sync {
    fn apply(&self, record: &mut RecordBuilder) -> Result<()>;
}

impl<F> Filter for F
where
    F: Fn(&mut RecordBuilder) -> Result<()> + Send + Sync,
{
    fn apply(&self, record: &mut RecordBuilder) -> Result<()> {
        self(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LogError;
    use crate::field::Field;
    use crate::record::RecordPool;

    #[test]
    fn test_closure_filters() {
        let enrich = |r: &mut RecordBuilder| -> Result<()> {
            r.push_field(Field::new("pid", 42u32));
            Ok(())
        };
        let reject = |r: &mut RecordBuilder| -> Result<()> {
            if r.text().contains("secret") {
                return Err(LogError::Filtered {
                    reason: "contains secret".into(),
                });
            }
            Ok(())
        };
        let filters: Vec<Box<dyn Filter>> = vec![Box::new(enrich), Box::new(reject)];

        let pool = RecordPool::new(2);
        let mut record = pool.acquire();
        record.set_text("plain");
        assert!(filters.iter().all(|f| f.apply(&mut record).is_ok()));
        assert_eq!(record.fields().len(), 1);

        record.set_text("secret token");
        assert!(matches!(
            filters[1].apply(&mut record),
            Err(LogError::Filtered { .. })
        ));
    }
}
