// [libs/domain/models/src/tests_serialization.rs]
/**
 * =================================================================
 * APARATO: WIRE CONTRACT SERIALIZATION TEST (V6.0 - INTEGRATION LEVEL)
 * CLASIFICACIÓN: TRINITY EVIDENCE (ESTRATO L2-MODELS)
 * RESPONSABILIDAD: CERTIFICACIÓN DE PARIDAD JSON DEL PROTOCOLO
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. ENVELOPE PARITY: Certifica que todo mensaje cristaliza como
 *    { type, id, ts, payload } sin deriva de discriminadores.
 * 2. HYGIENE: Uso del nombre de crate nominal, cumpliendo la física
 *    de tests de integración del workspace.
 *
 * # Mathematical Proof (Contract Stability):
 * El agente y el Dashboard parsean por discriminador textual. Un
 * cambio accidental de etiqueta rompería toda la flota: este test
 * congela la gramática snake_case del canal.
 * =================================================================
 */

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use kraken_domain_models::wire::{
        AgentMessage, ServerMessage, StopReason, TaskAssignment, TaskOutcome, WireEnvelope,
    };
    use kraken_domain_models::AttackMode;
    use uuid::Uuid;

    /**
     * CERTIFICACIÓN: El sobre de transporte expone type/id/ts/payload.
     */
    #[test]
    fn certify_envelope_shape_for_server_messages() {
        println!("\n🧪 [PROVING_GROUNDS]: Validating wire envelope strata...");

        let frozen_timestamp = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let stop_directive = ServerMessage::StopTask {
            task_id: Uuid::nil(),
            reason: StopReason::HashlistFullyCracked,
        };

        let envelope = WireEnvelope::seal(stop_directive, frozen_timestamp);
        let serialized_json = serde_json::to_value(&envelope)
            .expect("CRITICAL_FAULT: Envelope serialization collapsed.");

        assert_eq!(serialized_json["type"], "stop_task");
        assert_eq!(
            serialized_json["payload"]["reason"],
            "hashlist_fully_cracked"
        );
        assert!(serialized_json["id"].is_string(), "Envelope lost its id.");
        assert!(serialized_json["ts"].is_string(), "Envelope lost its ts.");

        println!("   ✅ [SUCCESS]: Envelope shape certified bit-perfect.");
    }

    /**
     * CERTIFICACIÓN: Roundtrip de una asignación de tarea completa.
     */
    #[test]
    fn certify_task_assignment_roundtrip() {
        let assignment = TaskAssignment {
            task_id: Uuid::new_v4(),
            job_execution_id: Uuid::new_v4(),
            attack_mode: AttackMode::Straight,
            hash_type: 1000,
            hashlist_id: 7,
            hashlist_version: "c0ffee".into(),
            binary_version_id: 2,
            wordlist_ids: vec![11],
            rule_ids: vec![3, 4],
            mask: None,
            keyspace_start: 0,
            keyspace_end: 1_000_000,
            rule_start_index: Some(0),
            rule_end_index: Some(99),
            chunk_duration_s: 300,
        };

        let outbound = ServerMessage::AssignTask(assignment.clone());
        let serialized_json = serde_json::to_string(&outbound)
            .expect("CRITICAL_FAULT: AssignTask serialization collapsed.");

        assert!(serialized_json.contains("\"type\":\"assign_task\""));

        let recovered: ServerMessage = serde_json::from_str(&serialized_json)
            .expect("CRITICAL_FAULT: AssignTask deserialization failed. Schema drift detected.");

        match recovered {
            ServerMessage::AssignTask(recovered_assignment) => {
                assert_eq!(recovered_assignment.task_id, assignment.task_id);
                assert_eq!(recovered_assignment.keyspace_end, 1_000_000);
                assert_eq!(recovered_assignment.rule_end_index, Some(99));
            }
            _ => panic!("INTEGRITY_COLLAPSE: Variant corrupted during transit."),
        }
    }

    /**
     * CERTIFICACIÓN: Los mensajes de agente conservan sus discriminadores
     * y los veredictos terminales parsean en snake_case.
     */
    #[test]
    fn certify_agent_message_discriminators() {
        let completion_report = AgentMessage::TaskComplete {
            task_id: Uuid::nil(),
            outcome: TaskOutcome::Completed,
            final_processed: 1_000_000,
            error: None,
        };

        let serialized_json = serde_json::to_value(&completion_report)
            .expect("CRITICAL_FAULT: TaskComplete serialization collapsed.");

        assert_eq!(serialized_json["type"], "task_complete");
        assert_eq!(serialized_json["payload"]["outcome"], "completed");

        let raw_crack_report = r#"{
            "type": "crack_report",
            "payload": {
                "task_id": "00000000-0000-0000-0000-000000000000",
                "hashlist_id": 9,
                "entries": [
                    { "hash": "8743b52063cd84097a65d1633f5c74f5", "plaintext": "hashcat" }
                ]
            }
        }"#;

        let recovered: AgentMessage = serde_json::from_str(raw_crack_report)
            .expect("CRITICAL_FAULT: CrackReport grammar rejected.");

        match recovered {
            AgentMessage::CrackReport {
                hashlist_id,
                entries,
                ..
            } => {
                assert_eq!(hashlist_id, 9);
                assert_eq!(entries.len(), 1);
                assert_eq!(entries[0].plaintext, "hashcat");
                assert_eq!(entries[0].username, None);
            }
            _ => panic!("INTEGRITY_COLLAPSE: CrackReport variant corrupted."),
        }
    }
}
