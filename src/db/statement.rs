/// Leading keywords of statements that return rows.
const READ_KEYWORDS: &[&str] = &[
    "SELECT", "WITH", "VALUES", "SHOW", "EXPLAIN", "DESCRIBE", "DESC", "PRAGMA", "TABLE",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Read,
    Write,
}

impl StatementKind {
    pub fn classify(sql: &str) -> Self {
        let keyword = sql
            .trim_start()
            .trim_start_matches(|c: char| c == '(' || c.is_whitespace())
            .split(|c: char| !c.is_ascii_alphabetic())
            .next()
            .unwrap_or("");

        if READ_KEYWORDS.iter().any(|k| k.eq_ignore_ascii_case(keyword)) {
            Self::Read
        } else {
            Self::Write
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_is_read_regardless_of_case_and_padding() {
        assert_eq!(StatementKind::classify("SELECT 1"), StatementKind::Read);
        assert_eq!(StatementKind::classify("  \n\tselect * from t"), StatementKind::Read);
        assert_eq!(StatementKind::classify("(SELECT 1) UNION (SELECT 2)"), StatementKind::Read);
        assert_eq!(StatementKind::classify("SeLeCt\n1"), StatementKind::Read);
        assert_eq!(StatementKind::classify("with x as (select 1) select * from x"), StatementKind::Read);
    }

    #[test]
    fn test_writes_and_ddl() {
        assert_eq!(StatementKind::classify("UPDATE t SET x=1 WHERE id=1"), StatementKind::Write);
        assert_eq!(StatementKind::classify("insert into t values (1)"), StatementKind::Write);
        assert_eq!(StatementKind::classify("CREATE TABLE t (id INT)"), StatementKind::Write);
        assert_eq!(StatementKind::classify("DELETE FROM t"), StatementKind::Write);
    }

    #[test]
    fn test_keyword_prefix_is_not_enough() {
        assert_eq!(StatementKind::classify("SELECTED_ROWS"), StatementKind::Write);
        assert_eq!(StatementKind::classify("DESCRIBED"), StatementKind::Write);
        assert_eq!(StatementKind::classify(""), StatementKind::Write);
    }
}
