/*!
 * Protocol layer — data structures, constants, and endpoint handling.
 *
 * Everything related to *what* we send to the collector:
 * - `types` — Event, Level, Exception, Frame, User
 * - `constants` — client identification, header names
 * - `dsn` — DSN parsing, store URL and auth header derivation
 */

pub mod constants;
pub mod dsn;
pub mod types;
