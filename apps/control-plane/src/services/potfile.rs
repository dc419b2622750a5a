// [apps/control-plane/src/services/potfile.rs]
/*!
 * =================================================================
 * APARATO: POTFILE WRITER SERVICE (V4.0)
 * CLASIFICACIÓN: APPLICATION SERVICES (ESTRATO L4)
 * RESPONSABILIDAD: APPEND SERIALIZADO DEL ARCHIVO AGREGADO DE CRACKS
 *
 * # Logic:
 * El potfile es un recurso compartido entre todas las campañas. Un
 * mutex asíncrono por archivo serializa los appends; las listas con
 * 'exclude_from_potfile' jamás llegan aquí.
 * =================================================================
 */

use anyhow::Context;
use kraken_domain_models::CrackEntry;
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

pub struct PotfileWriter {
    potfile_path: PathBuf,
    /// Candado de escritura por archivo.
    write_mutex: Mutex<()>,
}

impl PotfileWriter {
    pub fn new(potfile_path: PathBuf) -> Self {
        Self {
            potfile_path,
            write_mutex: Mutex::new(()),
        }
    }

    /**
     * Anexa pares (hash, plaintext) al potfile agregado.
     *
     * # Errors:
     * Falla si el directorio destino no existe o el disco rechaza la
     * escritura; el llamador trata el fallo como I/O transitorio.
     */
    pub async fn append_cracks(&self, entries: &[CrackEntry]) -> anyhow::Result<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let _append_guard = self.write_mutex.lock().await;

        let mut potfile_handle = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.potfile_path)
            .await
            .with_context(|| format!("potfile open failed: {}", self.potfile_path.display()))?;

        let mut buffered_lines = String::with_capacity(entries.len() * 48);
        for entry in entries {
            buffered_lines.push_str(&entry.hash);
            buffered_lines.push(':');
            buffered_lines.push_str(&entry.plaintext);
            buffered_lines.push('\n');
        }

        potfile_handle
            .write_all(buffered_lines.as_bytes())
            .await
            .context("potfile append burst rejected")?;
        potfile_handle.flush().await.context("potfile flush failed")?;

        debug!("💾 [POTFILE]: Appended {} cracked pairs.", entries.len());
        Ok(())
    }
}
