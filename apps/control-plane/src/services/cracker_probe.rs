// [apps/control-plane/src/services/cracker_probe.rs]
/*!
 * =================================================================
 * APARATO: CRACKER KEYSPACE PROBE (V5.0)
 * CLASIFICACIÓN: APPLICATION SERVICES (ESTRATO L4)
 * RESPONSABILIDAD: RESOLUCIÓN DE CARDINALIDADES DINÁMICAS DE REGLAS
 *
 * # Logic:
 * Un archivo de reglas dinámico no declara cardinalidad estática.
 * La sonda invoca el binario de cracking con el vector de argumentos
 * exacto del ataque y parsea el keyspace que el motor reporta; la
 * contribución del archivo se deriva dividiendo por las líneas del
 * diccionario base.
 * =================================================================
 */

use anyhow::Context;
use tokio::process::Command;
use tracing::{debug, instrument};

pub struct KeyspaceProbeService;

impl KeyspaceProbeService {
    /**
     * Sondea el keyspace efectivo de un ataque Straight con reglas.
     *
     * # Errors:
     * Falla si el binario no existe, termina con código distinto de
     * cero o emite una magnitud no parseable.
     */
    #[instrument(skip(binary_path, wordlist_path, rule_path))]
    pub async fn probe_straight_keyspace(
        binary_path: &str,
        wordlist_path: &str,
        rule_path: &str,
    ) -> anyhow::Result<i64> {
        let probe_output = Command::new(binary_path)
            .arg("--keyspace")
            .arg("--quiet")
            .arg("-a")
            .arg("0")
            .arg(wordlist_path)
            .arg("-r")
            .arg(rule_path)
            .output()
            .await
            .with_context(|| format!("keyspace probe spawn failed: {}", binary_path))?;

        anyhow::ensure!(
            probe_output.status.success(),
            "keyspace probe exited with {}: {}",
            probe_output.status,
            String::from_utf8_lossy(&probe_output.stderr).trim()
        );

        let stdout_text = String::from_utf8_lossy(&probe_output.stdout);
        let reported_magnitude = stdout_text
            .lines()
            .rev()
            .find_map(|line| line.trim().parse::<i64>().ok())
            .context("keyspace probe emitted no parseable magnitude")?;

        debug!(
            "🔬 [KEYSPACE_PROBE]: {} reported {} for rule file {}.",
            binary_path, reported_magnitude, rule_path
        );
        Ok(reported_magnitude)
    }

    /// Deriva la contribución multiplicativa de un archivo de reglas.
    pub fn derive_rule_contribution(probed_keyspace: i64, wordlist_line_count: i64) -> i64 {
        if wordlist_line_count <= 0 {
            return 1;
        }
        (probed_keyspace / wordlist_line_count).max(1)
    }
}
