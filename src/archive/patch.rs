//! In-place pointer patching of a copied archive.
use super::ArchiveSession;
use crate::accessor::{ArcReader, ArcWriter};
use crate::progress::Progress;
use crate::resource::{PatchPolicy, Resource};
use anyhow::{Context, Result};

/// Copies `source` verbatim into `out`, then writes each replaced resource's
/// stored bytes over its old data when they fit, or after the end of the
/// file otherwise, and overwrites only its directory fields.
pub fn patch_pointers(
    session: &ArchiveSession,
    resources: &[Resource],
    source: &mut ArcReader,
    out: &mut ArcWriter,
    progress: &mut dyn Progress,
) -> Result<()> {
    out.copy_from(source, 0, source.len())?;
    let mut end = source.len();
    progress.set_max(resources.len() as u64);
    for (i, resource) in resources.iter().enumerate() {
        progress.set_value(i as u64);
        let Some(replacement) = &resource.replacement else {
            continue;
        };
        let PatchPolicy::PatchableAt {
            offset_field,
            length_field,
            decompressed_field,
        } = resource.patch
        else {
            anyhow::bail!("{} cannot be patched in place", resource.name);
        };
        if resource.source != session.path() {
            anyhow::bail!(
                "{} is stored in {}, not in the patched archive",
                resource.name,
                resource.source.display()
            );
        }
        let data = replacement
            .load()
            .with_context(|| format!("Failed to load replacement for {}", resource.name))?;
        let stored = match &resource.exporter {
            Some(exporter) => exporter
                .pack(&data)
                .with_context(|| format!("Failed to pack {}", resource.name))?,
            None => data.clone(),
        };
        let stored_len = stored.len() as u64;
        let offset = if stored_len <= resource.length {
            resource.offset
        } else {
            end
        };
        out.seek_to(offset)?;
        out.write_bytes(&stored)?;
        if offset == end {
            end += stored_len;
        }
        out.patch_field(offset_field, offset)?;
        out.patch_field(length_field, stored_len)?;
        if let Some(field) = decompressed_field {
            out.patch_field(field, data.len() as u64)?;
        }
        tracing::debug!(
            "Patched {} at {:#x} ({} bytes)",
            resource.name,
            offset,
            stored_len
        );
        progress.on_entry_complete(&resource.name, true);
    }
    progress.set_value(resources.len() as u64);
    Ok(())
}
